//! Message-chain reassembly
//!
//! [`pull_entire_message`] reads a maximal chain of complete wire messages
//! from a stream into a caller-owned buffer. The read is greedy but bounded
//! by readiness: once the first header has arrived the current message is
//! always completed, and each message body read reserves room for one extra
//! header so a back-to-back next message is picked up without another
//! syscall. A payload-less message has no body read to piggyback the peek
//! on, so the source is probed once without waiting. When no header bytes
//! come along, the chain ends there.
//!
//! `chain_cap` disables further peeking once the buffer has grown past it,
//! so the buffer never exceeds the cap by more than one message plus one
//! header.

use std::io;
use std::pin::Pin;
use std::task::Poll;

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::error::Result;

use super::constants::{is_message_token, MESSAGE_HEADER_LEN, MIN_MESSAGE_LENGTH};

/// Read one or more concatenated messages from `source` into `buffer`.
///
/// On `Ok(true)` the buffer holds a whole number of complete messages with
/// no trailing bytes; an empty buffer means the stream closed cleanly before
/// the next message. `Ok(false)` reports a framing error (invalid token byte
/// or impossible length field) and leaves the buffer contents unspecified.
/// EOF inside a message surfaces as an `UnexpectedEof` I/O error.
pub async fn pull_entire_message<R>(
    source: &mut R,
    buffer: &mut Vec<u8>,
    chain_cap: usize,
) -> Result<bool>
where
    R: AsyncRead + Unpin,
{
    buffer.clear();

    // First header. A zero-byte read before anything arrived is a clean close.
    buffer.resize(MESSAGE_HEADER_LEN, 0);
    let mut got = 0;
    while got < MESSAGE_HEADER_LEN {
        let n = source.read(&mut buffer[got..MESSAGE_HEADER_LEN]).await?;
        if n == 0 {
            if got == 0 {
                buffer.clear();
                return Ok(true);
            }
            return Err(eof("stream closed inside a message header").into());
        }
        got += n;
    }

    let mut offset = 0;
    loop {
        if !is_message_token(buffer[offset]) {
            return Ok(false);
        }
        let declared = u32::from_be_bytes([
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
            buffer[offset + 4],
        ]);
        if declared < MIN_MESSAGE_LENGTH {
            return Ok(false);
        }

        let msg_end = offset + declared as usize + 1;
        let filled = offset + MESSAGE_HEADER_LEN;

        // Past the cap the peek is disabled; the in-flight message still completes.
        let peek = if filled > chain_cap {
            0
        } else {
            MESSAGE_HEADER_LEN
        };
        buffer.resize(msg_end + peek, 0);

        let body_rest = msg_end - filled;
        let mut got = 0;
        while got < body_rest {
            let n = source.read(&mut buffer[filled + got..msg_end + peek]).await?;
            if n == 0 {
                return Err(eof("stream closed inside a message body").into());
            }
            got += n;
        }

        // A payload-less message has no body read for the peek to ride on;
        // probe the source once for a back-to-back next header.
        if body_rest == 0 && peek > 0 {
            got = probe_read(source, &mut buffer[filled..filled + peek]).await?;
        }

        // Bytes beyond the body are the start of the next message's header.
        let extra = got - body_rest;
        if peek == 0 || extra == 0 {
            buffer.truncate(msg_end);
            return Ok(true);
        }

        // A partial header cannot be pushed back; finish reading it.
        let mut header = extra;
        while header < MESSAGE_HEADER_LEN {
            let n = source
                .read(&mut buffer[msg_end + header..msg_end + MESSAGE_HEADER_LEN])
                .await?;
            if n == 0 {
                return Err(eof("stream closed inside a message header").into());
            }
            header += n;
        }

        offset = msg_end;
        let next_declared = u32::from_be_bytes([
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
            buffer[offset + 4],
        ]);
        if next_declared == MIN_MESSAGE_LENGTH {
            // Payload-less message, fully consumed by the peek itself.
            if !is_message_token(buffer[offset]) {
                return Ok(false);
            }
            buffer.truncate(offset + MESSAGE_HEADER_LEN);
            return Ok(true);
        }
    }
}

/// One poll of `source` into `buf`: returns whatever bytes were already
/// available, 0 when none are ready yet (or the stream is at EOF). Never
/// waits, so a chain is not held open for data that has not arrived.
async fn probe_read<R>(source: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    std::future::poll_fn(|cx| {
        let mut probe = ReadBuf::new(&mut *buf);
        match Pin::new(&mut *source).poll_read(cx, &mut probe) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(probe.filled().len())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Ready(Ok(0)),
        }
    })
    .await
}

fn eof(reason: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, reason.to_string())
}
