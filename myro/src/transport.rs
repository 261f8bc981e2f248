//! The [`Transport`] trait.
use bytes::Bytes;
use std::task::{Context, Poll};

use crate::{
    Result,
    protocol::{
        BackendProtocol, Capabilities, FrontendProtocol, ServerError,
        backend::ERR_HEADER,
    },
};

/// A buffered stream which can send and receive mysql packets.
///
/// The transport is already past the connection phase, authentication is done by the caller.
pub trait Transport: Unpin {
    /// Send command to the server.
    ///
    /// Every command starts a new sequence, the response is expected to continue it.
    ///
    /// Note that this send is buffered, caller must also call
    /// [`poll_flush`][1] or [`flush`][2] afterwards.
    ///
    /// [1]: Transport::poll_flush
    /// [2]: TransportExt::flush
    fn send<F: FrontendProtocol>(&mut self, message: F);

    /// Poll to flush buffered commands.
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<Result<()>>;

    /// Poll to receive one reassembled packet payload.
    ///
    /// Calling `poll_recv` will also try to [`poll_flush`][1] if there is buffered command.
    ///
    /// [1]: Transport::poll_flush
    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<Bytes>>;

    /// Capabilities negotiated in connection phase.
    fn capabilities(&self) -> Capabilities;
}

impl<T> Transport for &mut T where T: Transport {
    fn send<F: FrontendProtocol>(&mut self, message: F) {
        T::send(self, message);
    }

    fn poll_flush(&mut self, cx: &mut Context) -> Poll<Result<()>> {
        T::poll_flush(self, cx)
    }

    fn poll_recv(&mut self, cx: &mut Context) -> Poll<Result<Bytes>> {
        T::poll_recv(self, cx)
    }

    fn capabilities(&self) -> Capabilities {
        T::capabilities(self)
    }
}

/// An extension trait to provide `Future` API for [`Transport`].
pub trait TransportExt: Transport {
    /// Flush buffered commands.
    fn flush(&mut self) -> impl Future<Output = Result<()>> {
        std::future::poll_fn(|cx|self.poll_flush(cx))
    }

    /// Receive a packet, `ERR` packet is returned as [`Err`].
    fn recv_packet(&mut self) -> impl Future<Output = Result<Bytes>> {
        std::future::poll_fn(|cx| {
            let packet = std::task::ready!(self.poll_recv(cx)?);
            match packet.first() {
                Some(&ERR_HEADER) => Poll::Ready(Err(ServerError::decode(packet)?.into())),
                _ => Poll::Ready(Ok(packet)),
            }
        })
    }

    /// Receive and decode a packet, `ERR` packet is returned as [`Err`].
    fn recv<B: BackendProtocol>(&mut self) -> impl Future<Output = Result<B>> {
        async { Ok(B::decode(self.recv_packet().await?)?) }
    }
}

impl<T> TransportExt for T where T: Transport { }
