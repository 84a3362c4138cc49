//! PostgreSQL protocol constants
//!
//! Constants for the PostgreSQL wire protocol version 3.0.
//! Reference: <https://www.postgresql.org/docs/current/protocol.html>

// ============================================================================
// Protocol Version
// ============================================================================

/// PostgreSQL protocol version 3.0 (major=3, minor=0)
/// Encoded as (major << 16) | minor = 196608
pub const PROTOCOL_VERSION_3_0: u32 = 196608;

// ============================================================================
// Special Request Codes (used in startup frames)
// ============================================================================

/// SSL request code - sent instead of StartupMessage to request SSL
/// Value: 80877103 (0x04D2162F)
pub const SSL_REQUEST_CODE: u32 = 80877103;

/// Cancel request code - sent to cancel a running query
/// Value: 80877102 (0x04D2162E)
pub const CANCEL_REQUEST_CODE: u32 = 80877102;

// ============================================================================
// Message Framing
// ============================================================================

/// Size of a post-startup message header: token byte + 4-byte length
pub const MESSAGE_HEADER_LEN: usize = 5;

/// The length field covers itself, so 4 is the minimum legal value
pub const MIN_MESSAGE_LENGTH: u32 = 4;

// ============================================================================
// Message Token Bytes
// ============================================================================

/// Error response ('E') - the only message the proxy synthesizes itself
pub const MSG_ERROR_RESPONSE: u8 = b'E';

/// Simple query ('Q')
pub const MSG_QUERY: u8 = b'Q';

/// Sync ('S') - frontend sync point, payload-less
pub const MSG_SYNC: u8 = b'S';

/// Terminate ('X') - client requests connection close
pub const MSG_TERMINATE: u8 = b'X';

/// Ready for query ('Z') - server is ready for a new query
pub const MSG_READY_FOR_QUERY: u8 = b'Z';

/// Check whether a byte is a valid leading token for a post-startup message,
/// in either direction. Anything else at a message boundary means the stream
/// has desynchronized.
#[inline]
pub fn is_message_token(token: u8) -> bool {
    matches!(
        token,
        b'1' | b'2'
            | b'3'
            | b'c'
            | b'd'
            | b'f'
            | b'n'
            | b'p'
            | b's'
            | b't'
            | b'A'
            | b'B'
            | b'C'
            | b'D'
            | b'E'
            | b'F'
            | b'G'
            | b'H'
            | b'I'
            | b'K'
            | b'N'
            | b'P'
            | b'Q'
            | b'R'
            | b'S'
            | b'T'
            | b'V'
            | b'W'
            | b'X'
            | b'Z'
    )
}

// ============================================================================
// Error/Notice Field Types
// ============================================================================

/// Severity field - ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG
pub const ERROR_FIELD_SEVERITY: u8 = b'S';

/// SQLSTATE code field - 5-character error code
pub const ERROR_FIELD_CODE: u8 = b'C';

/// Message field - primary human-readable error message
pub const ERROR_FIELD_MESSAGE: u8 = b'M';

/// Invalid authorization specification - the one SQLSTATE the proxy emits
pub const SQLSTATE_INVALID_AUTHORIZATION: &str = "28000";
