//! Startup-phase wire codec
//!
//! The first frame on a connection has no token byte: a big-endian length
//! covering itself, then a 4-byte discriminator, then (for a StartupMessage)
//! the parameter block. On success the original frame bytes are forwarded to
//! the backend verbatim, so decoding borrows from the frame instead of
//! rebuilding it.
//!
//! Reference: <https://www.postgresql.org/docs/current/protocol-message-formats.html>

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ProxyError, Result};

use super::constants::{
    CANCEL_REQUEST_CODE, ERROR_FIELD_CODE, ERROR_FIELD_MESSAGE, ERROR_FIELD_SEVERITY,
    MSG_ERROR_RESPONSE, PROTOCOL_VERSION_3_0, SQLSTATE_INVALID_AUTHORIZATION, SSL_REQUEST_CODE,
};

/// Largest startup frame accepted in a single read. Real clients send well
/// under 1 KiB of startup parameters.
pub const STARTUP_READ_SIZE: usize = 8192;

/// Fatal message sent when authorization denies a session or the startup
/// parameters are unusable.
pub const AUTH_FAILED_MESSAGE: &str = "Custom auth failed!";

/// Fatal message sent for an unrecognized startup discriminator (protocol 2
/// clients land here).
pub const UNKNOWN_STARTUP_MESSAGE: &str = "Unknown startup message, possibly an old client?";

/// A decoded startup frame. Borrows from the raw frame bytes.
#[derive(Debug)]
pub enum StartupFrame<'a> {
    /// TLS upgrade request; answered with a single 'S' or 'N' byte
    SslRequest,
    /// Query cancellation; forwarded verbatim, then the session ends
    CancelRequest,
    /// Protocol 3.0 startup with connection parameters
    Startup(StartupParams<'a>),
    /// Anything else, carrying the unrecognized discriminator
    Unknown(u32),
}

/// Startup parameters, kept as byte-strings.
///
/// The payload is a run of NUL-terminated strings read as alternating keys
/// and values; empty strings (including the terminating pair of NULs) are
/// skipped before pairing. Only `user` and `database` are ever decoded as
/// UTF-8; everything else passes through untouched inside the raw frame.
#[derive(Debug)]
pub struct StartupParams<'a> {
    pairs: Vec<(&'a [u8], &'a [u8])>,
}

impl<'a> StartupParams<'a> {
    fn parse(payload: &'a [u8]) -> Self {
        let mut pairs = Vec::new();
        let mut items = payload.split(|&b| b == 0).filter(|s| !s.is_empty());
        while let Some(key) = items.next() {
            match items.next() {
                Some(value) => pairs.push((key, value)),
                None => break,
            }
        }
        Self { pairs }
    }

    /// Look up a parameter value by its byte-string key.
    pub fn get(&self, key: &[u8]) -> Option<&'a [u8]> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    /// The `user` parameter, if present and valid UTF-8.
    pub fn user(&self) -> Option<&'a str> {
        self.get(b"user").and_then(|v| std::str::from_utf8(v).ok())
    }

    /// The `database` parameter, if present and valid UTF-8.
    pub fn database(&self) -> Option<&'a str> {
        self.get(b"database")
            .and_then(|v| std::str::from_utf8(v).ok())
    }
}

/// Read one startup frame from a fresh connection.
///
/// The frame is read in single-datagram fashion: one read of up to
/// [`STARTUP_READ_SIZE`] bytes, then the length prefix is decoded and the
/// frame is the prefix of that read. A client that fragments its startup
/// frame across segments is rejected as malformed.
///
/// Returns `Ok(None)` when the connection closed before sending anything.
pub async fn read_startup_frame<R>(source: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; STARTUP_READ_SIZE];
    let n = source.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if n < 8 {
        return Err(ProxyError::Protocol(format!(
            "startup frame too short: {} bytes",
            n
        )));
    }

    let declared = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if declared < 8 || declared > n {
        return Err(ProxyError::Protocol(format!(
            "malformed startup frame: declared {} bytes, received {}",
            declared, n
        )));
    }

    buf.truncate(declared);
    Ok(Some(buf))
}

/// Decode a startup frame previously read by [`read_startup_frame`].
///
/// `frame` must be at least 8 bytes (the reader guarantees this).
pub fn decode_startup_frame(frame: &[u8]) -> StartupFrame<'_> {
    let code = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
    match code {
        SSL_REQUEST_CODE => StartupFrame::SslRequest,
        CANCEL_REQUEST_CODE => StartupFrame::CancelRequest,
        PROTOCOL_VERSION_3_0 => StartupFrame::Startup(StartupParams::parse(&frame[8..])),
        other => StartupFrame::Unknown(other),
    }
}

/// Build a complete fatal ErrorResponse frame.
///
/// Layout: 'E', length covering itself and the body, then
/// `'S' "FATAL" \0 'C' "28000" \0 'M' <message> \0 \0`.
pub fn build_fatal_frame(message: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(message.len() + 18);
    body.push(ERROR_FIELD_SEVERITY);
    body.extend_from_slice(b"FATAL\0");
    body.push(ERROR_FIELD_CODE);
    body.extend_from_slice(SQLSTATE_INVALID_AUTHORIZATION.as_bytes());
    body.push(0);
    body.push(ERROR_FIELD_MESSAGE);
    body.extend_from_slice(message.as_bytes());
    body.push(0);
    body.push(0);

    let mut frame = Vec::with_capacity(body.len() + 5);
    frame.push(MSG_ERROR_RESPONSE);
    frame.extend_from_slice(&((body.len() + 4) as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}
