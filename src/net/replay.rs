//! Replay of sniffed bytes ahead of the live stream.
//!
//! # Responsibilities
//! - Own the probe bytes captured during sniffing
//! - Serve reads from the probe first, then from the live stream
//! - Pass writes, flush and shutdown straight through
//!
//! # Design Decisions
//! - The underlying stream is never rewound; proxied transports are not seekable
//! - A read served from the probe never touches the live stream

use std::io::{self, IoSlice};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

/// Largest probe the sniffer will capture.
pub const MAX_PROBE_LEN: usize = 512;

/// Immutable bytes captured from the head of a connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeBuffer(Box<[u8]>);

impl ProbeBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A connection whose first reads replay a [`ProbeBuffer`].
#[derive(Debug)]
pub struct ReplayableConnection<S> {
    inner: S,
    probe: ProbeBuffer,
    pos: usize,
}

impl<S> ReplayableConnection<S> {
    pub fn new(inner: S, probe: ProbeBuffer) -> Self {
        Self { inner, probe, pos: 0 }
    }

    /// Probe bytes not yet delivered to a reader.
    pub fn buffered(&self) -> &[u8] {
        &self.probe.as_bytes()[self.pos..]
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutable access to the live stream. Reading through it directly skips
    /// any bytes still in [`buffered`](Self::buffered).
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Split into the live stream and the undelivered probe bytes.
    pub fn into_parts(self) -> (S, Vec<u8>) {
        let rest = self.buffered().to_vec();
        (self.inner, rest)
    }
}

impl ReplayableConnection<TcpStream> {
    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.peer_addr()
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for ReplayableConnection<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = &this.probe.as_bytes()[this.pos..];
        if !remaining.is_empty() {
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            this.pos += n;
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for ReplayableConnection<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, data)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
