//! Network stream abstraction for TCP, Unix-socket, and TLS links
//!
//! `NetworkStream` lets the session and relay code treat a link generically:
//! the client side is TCP or server-side TLS, the backend side is TCP or a
//! Unix-domain socket. The TLS variant is boxed to keep the enum small.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_rustls::server::TlsStream;

/// A link that is plain TCP, a Unix-domain socket, or TLS-encrypted.
pub enum NetworkStream {
    /// Plain TCP connection
    Tcp(TcpStream),
    /// Unix-domain socket connection (backend side only)
    #[cfg(unix)]
    Unix(UnixStream),
    /// TLS-encrypted client connection
    Tls(Box<TlsStream<TcpStream>>),
}

impl NetworkStream {
    /// Check if this stream is TLS-encrypted.
    pub fn is_encrypted(&self) -> bool {
        matches!(self, NetworkStream::Tls(_))
    }

    /// Get the TLS protocol version if this is a TLS stream.
    pub fn tls_version(&self) -> Option<&'static str> {
        match self {
            NetworkStream::Tls(tls) => tls.get_ref().1.protocol_version().map(|v| match v {
                rustls::ProtocolVersion::TLSv1_2 => "TLSv1.2",
                rustls::ProtocolVersion::TLSv1_3 => "TLSv1.3",
                _ => "TLS (unknown version)",
            }),
            _ => None,
        }
    }

    /// Extract the TCP stream for a TLS upgrade.
    ///
    /// Returns `Err(self)` when the link is not plain TCP (a second upgrade
    /// attempt, or a Unix socket).
    pub fn into_tcp(self) -> Result<TcpStream, Self> {
        match self {
            NetworkStream::Tcp(stream) => Ok(stream),
            other => Err(other),
        }
    }
}

impl AsyncRead for NetworkStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            NetworkStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            NetworkStream::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetworkStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            NetworkStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            NetworkStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            NetworkStream::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            NetworkStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
            NetworkStream::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            NetworkStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            NetworkStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            NetworkStream::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}
