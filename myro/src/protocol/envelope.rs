//! Envelope framing.
//!
//! Outgoing messages are split and merged into envelopes by [`EnvelopeEncoder`], incoming
//! envelopes are reassembled into logical packets by [`EnvelopeDecoder`].
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_core::Stream;
use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
};

use super::ProtocolError;
use crate::{Error, common::verbose};

/// Envelope header size, 3 bytes length and 1 byte sequence.
pub const HEADER_SIZE: usize = 4;

/// Maximum payload length representable in envelope header.
pub const MAX_PAYLOAD_SIZE: usize = 0xFF_FFFF;

/// Envelope size which never split a message.
pub const UNBOUNDED_ENVELOPE_SIZE: usize = i32::MAX as usize;

/// One length prefixed, sequence numbered frame.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope {
    header: Bytes,
    payload: Bytes,
}

impl Envelope {
    /// Payload length.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` for the zero length terminal envelope.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn sequence(&self) -> u8 {
        self.header[3]
    }

    /// The 4 bytes header.
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn into_parts(self) -> (Bytes, Bytes) {
        (self.header, self.payload)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("len", &self.len())
            .field("sequence", &self.sequence())
            .finish()
    }
}

/// Split and merge buffers into envelopes of fixed maximum size.
///
/// Buffers are accumulated until `envelope_size` bytes are available, then exactly
/// `envelope_size` bytes are emitted as one envelope. When a single buffer covers the whole
/// envelope, the payload is a zero copy slice of it, otherwise the pending slices are merged.
///
/// [`finish`][EnvelopeEncoder::finish] always emit the remaining bytes, which is a zero length
/// envelope when message length is an exact multiple of `envelope_size` or message is empty.
#[derive(Debug)]
pub struct EnvelopeEncoder {
    envelope_size: usize,
    sequence: u8,
    pending: Vec<Bytes>,
    pending_len: usize,
    arena: BytesMut,
}

impl EnvelopeEncoder {
    /// Create new encoder.
    ///
    /// # Panics
    ///
    /// Panics if `envelope_size` is zero or larger than [`UNBOUNDED_ENVELOPE_SIZE`].
    pub fn new(envelope_size: usize, sequence: u8) -> EnvelopeEncoder {
        assert!(
            (1..=UNBOUNDED_ENVELOPE_SIZE).contains(&envelope_size),
            "envelope size must be in 1..=i32::MAX, found {envelope_size}",
        );
        Self {
            envelope_size,
            sequence,
            pending: Vec::new(),
            pending_len: 0,
            arena: BytesMut::new(),
        }
    }

    pub fn envelope_size(&self) -> usize {
        self.envelope_size
    }

    /// Sequence number of the next envelope.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Discard pending bytes and restart sequence.
    pub fn reset(&mut self, sequence: u8) {
        self.pending.clear();
        self.pending_len = 0;
        self.sequence = sequence;
    }

    /// Consume `buf`, emitting every completed envelope into `out`.
    pub fn push(&mut self, mut buf: Bytes, out: &mut impl Extend<Envelope>) -> Result<(), ProtocolError> {
        while !buf.is_empty() {
            let room = self.envelope_size - self.pending_len;

            if buf.len() < room {
                self.pending_len += buf.len();
                self.pending.push(buf);
                return Ok(());
            }

            self.pending.push(buf.split_to(room));
            self.pending_len += room;
            out.extend(Some(self.take_envelope()?));
        }
        Ok(())
    }

    /// End current message, returns the last envelope.
    pub fn finish(&mut self) -> Result<Envelope, ProtocolError> {
        self.take_envelope()
    }

    fn take_envelope(&mut self) -> Result<Envelope, ProtocolError> {
        let len = self.pending_len;
        if len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge { len });
        }

        self.arena.reserve(HEADER_SIZE);
        self.arena.put_uint_le(len as u64, 3);
        self.arena.put_u8(self.sequence);
        let header = self.arena.split().freeze();

        let payload = if self.pending.len() == 1 {
            self.pending.swap_remove(0)
        } else {
            self.arena.reserve(len);
            for chunk in self.pending.drain(..) {
                self.arena.put_slice(&chunk);
            }
            self.arena.split().freeze()
        };

        verbose!(len, sequence = self.sequence, "envelope");

        self.pending_len = 0;
        self.sequence = self.sequence.wrapping_add(1);

        Ok(Envelope { header, payload })
    }
}

pin_project_lite::pin_project! {
    /// [`Stream`] of envelopes from a stream of buffers.
    ///
    /// Dropping the stream drops every pending slice.
    #[derive(Debug)]
    pub struct Envelopes<S> {
        #[pin]
        source: S,
        encoder: EnvelopeEncoder,
        ready: VecDeque<Envelope>,
        done: bool,
    }
}

/// Frame a stream of buffers into envelopes of `envelope_size`, starting from `sequence`.
///
/// # Panics
///
/// Panics if `envelope_size` is zero or larger than [`UNBOUNDED_ENVELOPE_SIZE`].
pub fn envelopes<S>(source: S, envelope_size: usize, sequence: u8) -> Envelopes<S> {
    Envelopes {
        source,
        encoder: EnvelopeEncoder::new(envelope_size, sequence),
        ready: VecDeque::new(),
        done: false,
    }
}

impl<S, E> Stream for Envelopes<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Error>,
{
    type Item = Result<Envelope, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut me = self.project();
        loop {
            if let Some(envelope) = me.ready.pop_front() {
                return Poll::Ready(Some(Ok(envelope)));
            }

            if *me.done {
                return Poll::Ready(None);
            }

            let result = match ready!(me.source.as_mut().poll_next(cx)) {
                Some(Ok(buf)) => match me.encoder.push(buf, me.ready) {
                    Ok(()) => continue,
                    Err(err) => Err(err.into()),
                },
                Some(Err(err)) => Err(err.into()),
                None => me.encoder.finish().map_err(Into::into),
            };

            *me.done = true;
            if result.is_err() {
                me.encoder.reset(0);
                me.ready.clear();
            }
            return Poll::Ready(Some(result));
        }
    }
}

/// Reassemble logical packets from incoming envelopes.
///
/// An envelope with payload of exactly the envelope size, [`MAX_PAYLOAD_SIZE`] by default,
/// is continued by the next envelope.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    envelope_size: usize,
    sequence: u8,
    partial: BytesMut,
}

impl EnvelopeDecoder {
    pub fn new(sequence: u8) -> EnvelopeDecoder {
        Self::with_envelope_size(MAX_PAYLOAD_SIZE, sequence)
    }

    /// Create decoder of custom envelope size.
    ///
    /// # Panics
    ///
    /// Panics if `envelope_size` is zero or larger than [`MAX_PAYLOAD_SIZE`].
    pub fn with_envelope_size(envelope_size: usize, sequence: u8) -> EnvelopeDecoder {
        assert!(
            (1..=MAX_PAYLOAD_SIZE).contains(&envelope_size),
            "envelope size must be in 1..=0xFFFFFF, found {envelope_size}",
        );
        Self { envelope_size, sequence, partial: BytesMut::new() }
    }

    /// Sequence number of the next expected envelope.
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Discard partial packet and expect `sequence` next.
    pub fn reset(&mut self, sequence: u8) {
        self.partial.clear();
        self.sequence = sequence;
    }

    /// Try to decode one logical packet from `buf`.
    ///
    /// Returns `Ok(None)` when more bytes are required.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
        loop {
            let Some(header) = buf.get(..HEADER_SIZE) else {
                return Ok(None);
            };

            let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
            let found = header[3];

            if found != self.sequence {
                return Err(ProtocolError::SequenceMismatch { expect: self.sequence, found });
            }

            if len > self.envelope_size {
                return Err(ProtocolError::EnvelopeTooLarge { len, max: self.envelope_size });
            }

            if buf.len() < HEADER_SIZE + len {
                buf.reserve(HEADER_SIZE + len - buf.len());
                return Ok(None);
            }

            buf.advance(HEADER_SIZE);
            let payload = buf.split_to(len);
            self.sequence = self.sequence.wrapping_add(1);

            if len == self.envelope_size {
                self.partial.extend_from_slice(&payload);
                continue;
            }

            if self.partial.is_empty() {
                return Ok(Some(payload.freeze()));
            }

            self.partial.extend_from_slice(&payload);
            return Ok(Some(self.partial.split().freeze()));
        }
    }

    /// Check that no envelope is left incomplete at end of stream.
    pub fn finish(&self, buf: &BytesMut) -> Result<(), ProtocolError> {
        let remaining = buf.len() + self.partial.len();
        match remaining {
            0 => Ok(()),
            _ => Err(ProtocolError::Truncated { remaining }),
        }
    }
}
