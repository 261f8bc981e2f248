//! Buffered [`Transport`] over tokio io.
use bytes::{Bytes, BytesMut};
use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    Config, Result,
    common::{span, verbose},
    io,
    protocol::{
        Capabilities, EnvelopeDecoder, EnvelopeEncoder, FrontendProtocol, ProtocolError,
        envelope::MAX_PAYLOAD_SIZE, frontend,
    },
    transport::Transport,
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Buffered connection to mysql server.
///
/// The io must already be past the connection phase.
#[derive(Debug)]
pub struct Socket<IO> {
    io: IO,
    capabilities: Capabilities,
    encoder: EnvelopeEncoder,
    decoder: EnvelopeDecoder,
    write_buf: BytesMut,
    /// Envelope headers and payloads waiting to be written.
    queue: VecDeque<Bytes>,
    read_buf: BytesMut,
    /// Framing error from `send`, reported on the next flush.
    error: Option<ProtocolError>,
}

impl<IO> Socket<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: IO) -> Self {
        Self::with_envelope_size(io, MAX_PAYLOAD_SIZE)
    }

    /// Create socket using the envelope size in [`Config`].
    pub fn with_config(io: IO, config: &Config) -> Self {
        Self::with_envelope_size(io, config.envelope_size())
    }

    /// Create socket with custom envelope size for outgoing commands.
    ///
    /// Server replies are always framed at `0xFFFFFF`.
    ///
    /// # Panics
    ///
    /// Panics if `envelope_size` is zero or larger than `0xFFFFFF`.
    pub fn with_envelope_size(io: IO, envelope_size: usize) -> Self {
        assert!(
            (1..=MAX_PAYLOAD_SIZE).contains(&envelope_size),
            "envelope size must be in 1..=0xFFFFFF, found {envelope_size}",
        );
        Self {
            io,
            capabilities: Capabilities::default(),
            encoder: EnvelopeEncoder::new(envelope_size, 0),
            decoder: EnvelopeDecoder::new(0),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            queue: VecDeque::new(),
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            error: None,
        }
    }

    /// Set capabilities negotiated in connection phase.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn get_ref(&self) -> &IO {
        &self.io
    }

    pub fn into_inner(self) -> IO {
        self.io
    }

    fn enqueue(&mut self, message: Bytes) -> Result<(), ProtocolError> {
        span!("enqueue", len = message.len());
        let mut envelopes = Vec::with_capacity(1);
        self.encoder.reset(0);
        self.encoder.push(message, &mut envelopes)?;
        envelopes.push(self.encoder.finish()?);

        for envelope in envelopes {
            let (header, payload) = envelope.into_parts();
            self.queue.push_back(header);
            if !payload.is_empty() {
                self.queue.push_back(payload);
            }
        }

        self.decoder.reset(self.encoder.sequence());
        Ok(())
    }
}

impl<IO> Transport for Socket<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn send<F: FrontendProtocol>(&mut self, message: F) {
        frontend::write(message, &mut self.write_buf);
        let message = self.write_buf.split().freeze();
        verbose!(len = message.len(), command = message[0], "send");
        if let Err(err) = self.enqueue(message) {
            self.error.get_or_insert(err);
        }
    }

    fn poll_flush(&mut self, cx: &mut Context) -> Poll<Result<()>> {
        if let Some(err) = self.error.take() {
            self.queue.clear();
            return Poll::Ready(Err(err.into()));
        }

        if self.queue.is_empty() {
            return Poll::Ready(Ok(()));
        }

        while let Some(front) = self.queue.front_mut() {
            ready!(io::poll_write_all(&mut self.io, front, cx))?;
            self.queue.pop_front();
        }

        ready!(Pin::new(&mut self.io).poll_flush(cx))?;
        Poll::Ready(Ok(()))
    }

    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<Bytes>> {
        ready!(self.poll_flush(cx))?;

        loop {
            if let Some(packet) = self.decoder.decode(&mut self.read_buf)? {
                verbose!(len = packet.len(), "recv");
                return Poll::Ready(Ok(packet));
            }

            self.read_buf.reserve(DEFAULT_BUF_CAPACITY);
            let n = ready!(io::poll_read(&mut self.io, &mut self.read_buf, cx))?;

            if n == 0 {
                self.decoder.finish(&self.read_buf)?;
                return Poll::Ready(Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into()));
            }
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
