use crate::error::{FrameError, Result};

pub const BASE_HEADER_LEN: usize = 2;
pub const MAX_CONTROL_PAYLOAD: u8 = 125;

/// Highest upper word of a 64-bit length that keeps the total at or below 2^53 - 1.
pub const MAX_SAFE_UPPER_WORD: u32 = (1 << 21) - 1;

const FIN_BIT: u8 = 0x80;
const RSV1_BIT: u8 = 0x40;
const RSV2_RSV3_BITS: u8 = 0x30;
const OPCODE_BITS: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN_BITS: u8 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, Ping and Pong.
    pub const fn is_control(self) -> bool {
        matches!(self, Self::Close | Self::Ping | Self::Pong)
    }
}

/// The two leading bytes of a frame, after opcode resolution.
///
/// `opcode` is the effective opcode: a continuation frame carries the opcode
/// of the message it continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub rsv1_compressed: bool,
    pub opcode: Opcode,
    pub payload_len_indicator: u8,
    pub masked: bool,
}

impl FrameHeader {
    /// Number of extended length bytes that follow the base header.
    pub fn extended_len_size(&self) -> usize {
        match self.payload_len_indicator {
            126 => 2,
            127 => 8,
            _ => 0,
        }
    }
}

/// Parses the base header. `fragmented` is the opcode of the message left
/// open by an earlier non-final frame, if any.
pub fn parse_header(
    bytes: [u8; BASE_HEADER_LEN],
    fragmented: Option<Opcode>,
) -> Result<FrameHeader> {
    let [first, second] = bytes;

    // 1. Byte 0: FIN | RSV1 | RSV2 | RSV3 | Opcode
    if first & RSV2_RSV3_BITS != 0 {
        return Err(FrameError::ReservedBits);
    }

    let rsv1_compressed = first & RSV1_BIT != 0;
    let fin = first & FIN_BIT != 0;
    let raw_opcode = first & OPCODE_BITS;

    // 2. Byte 1: Mask | 7-bit length (126 / 127 point at an extended length)
    let payload_len_indicator = second & LEN_BITS;
    let masked = second & MASK_BIT != 0;

    // 3. Resolve the opcode against the open message, if any
    let opcode = match Opcode::from_u8(raw_opcode) {
        Some(Opcode::Continuation) => {
            if rsv1_compressed {
                return Err(FrameError::Rsv1Set);
            }
            fragmented.ok_or(FrameError::UnexpectedContinuation)?
        }
        Some(op @ (Opcode::Text | Opcode::Binary)) => {
            if fragmented.is_some() {
                return Err(FrameError::UnexpectedDataFrame(raw_opcode));
            }
            op
        }
        // Control frames: never fragmented, never compressed, short
        Some(op) => {
            if !fin {
                return Err(FrameError::FragmentedControlFrame);
            }
            if rsv1_compressed {
                return Err(FrameError::Rsv1Set);
            }
            if payload_len_indicator > MAX_CONTROL_PAYLOAD {
                return Err(FrameError::ControlFrameTooLong(u64::from(payload_len_indicator)));
            }
            op
        }
        None => return Err(FrameError::InvalidOpcode(raw_opcode)),
    };

    Ok(FrameHeader {
        fin,
        rsv1_compressed,
        opcode,
        payload_len_indicator,
        masked,
    })
}

/// Big-endian 16-bit extended length (indicator 126).
pub fn parse_extended_16(bytes: [u8; 2]) -> u64 {
    u64::from(u16::from_be_bytes(bytes))
}

/// Big-endian 64-bit extended length (indicator 127), capped at 2^53 - 1.
pub fn parse_extended_64(bytes: [u8; 8]) -> Result<u64> {
    let upper = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if upper > MAX_SAFE_UPPER_WORD {
        return Err(FrameError::PayloadTooLong);
    }
    let lower = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok((u64::from(upper) << 32) | u64::from(lower))
}
