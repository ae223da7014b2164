use arrayvec::ArrayVec;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

use super::header::{Opcode, MAX_CONTROL_PAYLOAD};

/// Base header plus the 64-bit extended length. Server frames carry no mask key.
pub const MAX_HEADER_LEN: usize = 10;

const FIN_BIT: u8 = 0x80;

/// A frame ready for the socket: write `header` then `payload`, in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub header: ArrayVec<u8, MAX_HEADER_LEN>,
    pub payload: Bytes,
}

impl EncodedFrame {
    pub fn parts(&self) -> [&[u8]; 2] {
        [&self.header, &self.payload]
    }

    pub fn len(&self) -> usize {
        self.header.len() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Frames `message` as a single unmasked Text frame with FIN set.
/// No message, no output.
pub fn encode(message: Option<Bytes>) -> Option<EncodedFrame> {
    message.map(|payload| frame(Opcode::Text, payload))
}

/// Single unmasked FIN frame with an arbitrary opcode.
pub fn encode_frame(opcode: Opcode, payload: Bytes) -> Result<EncodedFrame> {
    if opcode == Opcode::Continuation {
        return Err(FrameError::UnexpectedContinuation);
    }
    if opcode.is_control() && payload.len() > usize::from(MAX_CONTROL_PAYLOAD) {
        return Err(FrameError::ControlFrameTooLong(payload.len() as u64));
    }
    Ok(frame(opcode, payload))
}

/// Close frame with a status code and a UTF-8 reason.
pub fn encode_close(code: u16, reason: &str) -> Result<EncodedFrame> {
    let mut payload = BytesMut::with_capacity(2 + reason.len());
    payload.put_u16(code);
    payload.put_slice(reason.as_bytes());
    encode_frame(Opcode::Close, payload.freeze())
}

fn frame(opcode: Opcode, payload: Bytes) -> EncodedFrame {
    EncodedFrame {
        header: write_header(FIN_BIT | opcode.as_u8(), payload.len()),
        payload,
    }
}

fn write_header(first: u8, len: usize) -> ArrayVec<u8, MAX_HEADER_LEN> {
    let mut header = ArrayVec::new();

    // 1. Byte 0: FIN (0x80) | Opcode
    header.push(first);

    // 2. Byte 1: Mask bit clear (server frames) | Length
    if len <= 125 {
        header.push(len as u8);
    } else if len < 65536 {
        // 3. 16-bit extended length, big-endian
        header.push(126);
        header.extend((len as u16).to_be_bytes());
    } else {
        // 3. 64-bit extended length, big-endian
        header.push(127);
        header.extend((len as u64).to_be_bytes());
    }

    header
}
