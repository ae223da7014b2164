use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrameError>;

/// Close status codes (RFC 6455 Section 7.4.1) the transport sends before
/// dropping a connection that failed to decode.
pub const CLOSE_PROTOCOL_ERROR: u16 = 1002;
pub const CLOSE_INVALID_PAYLOAD: u16 = 1007;
pub const CLOSE_MESSAGE_TOO_BIG: u16 = 1009;

/// Whether `code` may appear in a Close frame on the wire. 1004-1006 and
/// 1015 are reserved for local use, and anything below 1000 is unassigned.
#[must_use]
pub const fn is_valid_close_code(code: u16) -> bool {
    matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
}

/// Coarse classification of a fatal decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameErrorKind {
    ReservedBit,
    Opcode,
    Length,
    Quota,
    Encoding,
}

/// Every variant is fatal for the connection. The codec refuses further
/// input once one has been returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("RSV2 and RSV3 must be clear")]
    ReservedBits,

    #[error("RSV1 must be clear")]
    Rsv1Set,

    #[error("invalid opcode 0")]
    UnexpectedContinuation,

    #[error("invalid opcode {0}")]
    UnexpectedDataFrame(u8),

    #[error("invalid opcode unmask {0}")]
    InvalidOpcode(u8),

    #[error("FIN must be set")]
    FragmentedControlFrame,

    #[error("invalid payload length {0}")]
    ControlFrameTooLong(u64),

    #[error("invalid close frame payload")]
    InvalidClosePayload,

    #[error("invalid status code {0}")]
    InvalidCloseCode(u16),

    #[error("Unsupported WebSocket frame: payload length > 2^53 - 1")]
    PayloadTooLong,

    #[error("Max payload size exceeded")]
    MaxPayloadExceeded { total: u64, max: u64 },

    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    #[error("codec already failed")]
    Poisoned,
}

impl FrameError {
    #[must_use]
    pub fn kind(&self) -> FrameErrorKind {
        match self {
            Self::ReservedBits | Self::Rsv1Set => FrameErrorKind::ReservedBit,
            Self::UnexpectedContinuation
            | Self::UnexpectedDataFrame(_)
            | Self::InvalidOpcode(_)
            | Self::FragmentedControlFrame
            | Self::ControlFrameTooLong(_)
            | Self::InvalidClosePayload
            | Self::InvalidCloseCode(_)
            | Self::Poisoned => FrameErrorKind::Opcode,
            Self::PayloadTooLong => FrameErrorKind::Length,
            Self::MaxPayloadExceeded { .. } => FrameErrorKind::Quota,
            Self::InvalidUtf8 => FrameErrorKind::Encoding,
        }
    }

    /// Status code for the Close frame sent ahead of teardown.
    #[must_use]
    pub fn close_code(&self) -> u16 {
        match self.kind() {
            FrameErrorKind::Quota | FrameErrorKind::Length => CLOSE_MESSAGE_TOO_BIG,
            FrameErrorKind::Encoding => CLOSE_INVALID_PAYLOAD,
            FrameErrorKind::ReservedBit | FrameErrorKind::Opcode => CLOSE_PROTOCOL_ERROR,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors that end the echo server or one of its connections.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
