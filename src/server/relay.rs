//! Relay halves for authorized sessions
//!
//! Once a session is authorized it becomes two unidirectional forwarders,
//! one per direction. Each half pulls whole message chains from its input
//! link and writes each chain to its output link in a single write. A clean
//! EOF ends the half quietly; framing errors are logged at error level;
//! I/O errors and timeouts end the half silently. The session tears both
//! halves down together.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::{ProxyError, Result};
use crate::protocol::framer::pull_entire_message;

/// Forward message chains from `reader` to `writer` until the input closes
/// or fails. Returns the number of bytes forwarded on clean EOF.
pub async fn relay_half<R, W>(
    mut reader: R,
    mut writer: W,
    direction: &'static str,
    read_timeout: Duration,
    chain_cap: usize,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = Vec::with_capacity(8192);
    let mut total_bytes = 0u64;

    loop {
        let ok = match timeout(
            read_timeout,
            pull_entire_message(&mut reader, &mut buffer, chain_cap),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                debug!(
                    "{}: read timeout ({:?}) after {} bytes",
                    direction, read_timeout, total_bytes
                );
                return Err(ProxyError::Timeout(format!("{} read", direction)));
            }
        };

        if !ok {
            error!("{}: invalid message token, dropping link", direction);
            return Err(ProxyError::Protocol(format!(
                "invalid message token on {}",
                direction
            )));
        }

        if buffer.is_empty() {
            debug!("{}: EOF after {} bytes", direction, total_bytes);
            break;
        }

        trace!("{}: {} byte chain", direction, buffer.len());
        writer.write_all(&buffer).await?;
        writer.flush().await?;
        total_bytes += buffer.len() as u64;
    }

    let _ = writer.shutdown().await;

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    const TIMEOUT: Duration = Duration::from_secs(5);
    const CAP: usize = 10_000_000;

    fn message(token: u8, payload: &[u8]) -> Vec<u8> {
        let mut msg = vec![token];
        msg.extend_from_slice(&((payload.len() + 4) as u32).to_be_bytes());
        msg.extend_from_slice(payload);
        msg
    }

    #[tokio::test]
    async fn test_forwards_messages_until_eof() {
        let (mut input, reader) = duplex(1024);
        let (writer, mut output) = duplex(1024);

        let mut bytes = message(b'Q', b"SELECT 1\0");
        bytes.extend_from_slice(&message(b'X', b""));
        input.write_all(&bytes).await.unwrap();
        drop(input);

        let total = relay_half(reader, writer, "test", TIMEOUT, CAP)
            .await
            .unwrap();
        assert_eq!(total, bytes.len() as u64);

        let mut forwarded = Vec::new();
        output.read_to_end(&mut forwarded).await.unwrap();
        assert_eq!(forwarded, bytes);
    }

    #[tokio::test]
    async fn test_clean_eof_writes_nothing() {
        let (input, reader) = duplex(64);
        let (writer, mut output) = duplex(64);
        drop(input);

        let total = relay_half(reader, writer, "test", TIMEOUT, CAP)
            .await
            .unwrap();
        assert_eq!(total, 0);

        let mut forwarded = Vec::new();
        output.read_to_end(&mut forwarded).await.unwrap();
        assert!(forwarded.is_empty());
    }

    #[tokio::test]
    async fn test_framing_error_terminates_half() {
        let (mut input, reader) = duplex(64);
        let (writer, _output) = duplex(64);

        input.write_all(&message(b'@', b"bad")).await.unwrap();

        let err = relay_half(reader, writer, "test", TIMEOUT, CAP)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_mid_message_eof_is_io_error() {
        let (mut input, reader) = duplex(64);
        let (writer, _output) = duplex(64);

        let msg = message(b'Q', b"ABCD");
        input.write_all(&msg[..6]).await.unwrap();
        drop(input);

        let err = relay_half(reader, writer, "test", TIMEOUT, CAP)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));
    }

    #[tokio::test]
    async fn test_idle_input_times_out() {
        let (_input, reader) = duplex(64);
        let (writer, _output) = duplex(64);

        let err = relay_half(reader, writer, "test", Duration::from_millis(50), CAP)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Timeout(_)));
    }
}
