//! WebSocket (RFC 6455) framing for the server role.
//!
//! The codec is sans-io: feed it socket bytes, get messages back. The
//! `net::session` module wires one codec to one `mio` socket.

pub mod config;
pub mod error;
pub mod net;

pub use config::Config;
pub use error::{FrameError, FrameErrorKind, Result};
pub use net::framing::{
    encode, encode_close, encode_frame, ControlFrame, Decoded, EncodedFrame, FrameCodec, Message,
    Opcode,
};
