//! Server-side RFC 6455 framing.
//!
//! [`FrameCodec`] turns arbitrarily chunked socket reads into complete
//! messages, reassembling fragments and unmasking client payloads. The
//! encoder builds unmasked server frames.

pub mod accumulator;
pub mod encoder;
pub mod header;
pub mod mask;
pub mod utf8;

use std::mem;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::{is_valid_close_code, FrameError, Result};

use accumulator::ByteAccumulator;
use header::{parse_extended_16, parse_extended_64, parse_header, FrameHeader};
use mask::{apply_mask, MaskKey};

pub use encoder::{encode, encode_close, encode_frame, EncodedFrame, MAX_HEADER_LEN};
pub use header::Opcode;
pub use utf8::is_valid_utf8;

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Text or Binary.
    pub opcode: Opcode,
    /// RSV1 was set on the first frame. The payload is passed through as is.
    pub compressed: bool,
    pub payload: Bytes,
}

impl Message {
    pub fn is_text(&self) -> bool {
        self.opcode == Opcode::Text
    }

    pub fn as_text(&self) -> Option<&str> {
        if !self.is_text() {
            return None;
        }
        std::str::from_utf8(&self.payload).ok()
    }
}

/// A Close, Ping or Pong frame, unmasked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    pub opcode: Opcode,
    pub payload: Bytes,
}

impl ControlFrame {
    /// Status code of a Close frame, if it carries one.
    pub fn close_code(&self) -> Option<u16> {
        if self.opcode != Opcode::Close || self.payload.len() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.payload[0], self.payload[1]]))
    }

    pub fn close_reason(&self) -> Option<&str> {
        if self.close_code().is_none() {
            return None;
        }
        std::str::from_utf8(&self.payload[2..]).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Message(Message),
    Control(ControlFrame),
    /// Not an error: feed more bytes.
    Incomplete,
}

/// Where the parser resumes when more bytes arrive.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Header,
    ExtendedLength(FrameHeader),
    MaskKey {
        header: FrameHeader,
        payload_len: u64,
    },
    Payload {
        header: FrameHeader,
        payload_len: u64,
        mask: Option<MaskKey>,
    },
}

/// Per-connection decoder state. Not shared between connections.
#[derive(Debug)]
pub struct FrameCodec {
    max_payload: u64,
    validate_binary_utf8: bool,
    input: ByteAccumulator,
    stage: Stage,
    fragmented: Option<Opcode>,
    fragmented_compressed: bool,
    total_payload_length: u64,
    message_length: u64,
    fragments: Vec<Bytes>,
    poisoned: bool,
}

impl FrameCodec {
    /// `max_payload` bounds the cumulative payload of one message, 0 = unlimited.
    pub fn new(max_payload: u64) -> Self {
        Self {
            max_payload,
            validate_binary_utf8: false,
            input: ByteAccumulator::new(),
            stage: Stage::Header,
            fragmented: None,
            fragmented_compressed: false,
            total_payload_length: 0,
            message_length: 0,
            fragments: Vec::new(),
            poisoned: false,
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut codec = Self::new(config.max_payload);
        codec.validate_binary_utf8 = config.validate_binary_utf8;
        codec
    }

    /// Also reject Binary messages that are not valid UTF-8.
    pub fn validate_binary_utf8(mut self, enabled: bool) -> Self {
        self.validate_binary_utf8 = enabled;
        self
    }

    pub fn max_payload(&self) -> u64 {
        self.max_payload
    }

    /// Bytes received but not yet consumed by a parse stage.
    pub fn buffered_bytes(&self) -> usize {
        self.input.available()
    }

    pub fn total_payload_length(&self) -> u64 {
        self.total_payload_length
    }

    pub fn message_length(&self) -> u64 {
        self.message_length
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_fragmented(&self) -> bool {
        self.fragmented.is_some()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Appends `chunk` to the pending input and parses as far as possible.
    ///
    /// Returns the first complete message or control frame. Further items
    /// already buffered are drained by calling again with an empty chunk.
    /// Any error is fatal: the codec rejects all later input.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Decoded> {
        if self.poisoned {
            return Err(FrameError::Poisoned);
        }

        self.input.push(chunk);

        self.advance().map_err(|err| {
            warn!("websocket protocol violation: {}", err);
            self.poisoned = true;
            self.input.clear();
            self.fragments.clear();
            err
        })
    }

    fn advance(&mut self) -> Result<Decoded> {
        loop {
            match self.stage {
                Stage::Header => {
                    let Some(bytes) = self.input.take_array::<2>() else {
                        return Ok(Decoded::Incomplete);
                    };
                    let header = parse_header(bytes, self.fragmented)?;
                    trace!(
                        "frame header {} fin={} opcode={:?} len={} masked={}",
                        hex::encode(bytes),
                        header.fin,
                        header.opcode,
                        header.payload_len_indicator,
                        header.masked
                    );

                    if !header.fin && self.fragmented.is_none() {
                        self.fragmented = Some(header.opcode);
                        self.fragmented_compressed = header.rsv1_compressed;
                    }

                    self.stage = match header.payload_len_indicator {
                        126 | 127 => Stage::ExtendedLength(header),
                        len => {
                            let len = u64::from(len);
                            self.check_length(len, header.opcode)?;
                            Self::after_length(header, len)
                        }
                    };
                }
                Stage::ExtendedLength(header) => {
                    let len = if header.extended_len_size() == 2 {
                        let Some(bytes) = self.input.take_array::<2>() else {
                            return Ok(Decoded::Incomplete);
                        };
                        parse_extended_16(bytes)
                    } else {
                        let Some(bytes) = self.input.take_array::<8>() else {
                            return Ok(Decoded::Incomplete);
                        };
                        parse_extended_64(bytes)?
                    };
                    self.check_length(len, header.opcode)?;
                    self.stage = Self::after_length(header, len);
                }
                Stage::MaskKey {
                    header,
                    payload_len,
                } => {
                    let Some(key) = self.input.take_array::<4>() else {
                        return Ok(Decoded::Incomplete);
                    };
                    self.stage = Stage::Payload {
                        header,
                        payload_len,
                        mask: Some(key),
                    };
                }
                Stage::Payload {
                    header,
                    payload_len,
                    mask,
                } => {
                    let len =
                        usize::try_from(payload_len).map_err(|_| FrameError::PayloadTooLong)?;
                    let Some(mut data) = self.input.take(len) else {
                        return Ok(Decoded::Incomplete);
                    };
                    if let Some(key) = mask {
                        apply_mask(&mut data, &key);
                    }
                    self.stage = Stage::Header;

                    if let Some(done) = self.finish_frame(header, data)? {
                        return Ok(done);
                    }
                }
            }
        }
    }

    fn after_length(header: FrameHeader, payload_len: u64) -> Stage {
        if header.masked {
            Stage::MaskKey {
                header,
                payload_len,
            }
        } else {
            Stage::Payload {
                header,
                payload_len,
                mask: None,
            }
        }
    }

    /// Adds a data frame's length to the running total for its message.
    fn check_length(&mut self, payload_len: u64, opcode: Opcode) -> Result<()> {
        if payload_len == 0 || opcode.is_control() {
            return Ok(());
        }

        self.total_payload_length = self.total_payload_length.saturating_add(payload_len);
        if self.max_payload > 0 && self.total_payload_length > self.max_payload {
            return Err(FrameError::MaxPayloadExceeded {
                total: self.total_payload_length,
                max: self.max_payload,
            });
        }
        Ok(())
    }

    fn finish_frame(&mut self, header: FrameHeader, data: BytesMut) -> Result<Option<Decoded>> {
        let payload = data.freeze();

        if header.opcode.is_control() {
            if header.opcode == Opcode::Close {
                validate_close_payload(&payload)?;
            }
            debug!("control frame {:?} ({} bytes)", header.opcode, payload.len());
            return Ok(Some(Decoded::Control(ControlFrame {
                opcode: header.opcode,
                payload,
            })));
        }

        if !payload.is_empty() {
            self.message_length = self.total_payload_length;
            self.fragments.push(payload);
        }

        if !header.fin {
            debug!(
                "fragment {} buffered, {} bytes so far",
                self.fragments.len(),
                self.total_payload_length
            );
            return Ok(None);
        }

        let compressed = mem::take(&mut self.fragmented_compressed) || header.rsv1_compressed;
        self.fragmented = None;
        let message_length = mem::take(&mut self.message_length);
        self.total_payload_length = 0;
        let fragments = mem::take(&mut self.fragments);
        let fragment_count = fragments.len();

        let payload = concat(fragments, message_length);

        if (header.opcode == Opcode::Text || self.validate_binary_utf8) && !is_valid_utf8(&payload)
        {
            return Err(FrameError::InvalidUtf8);
        }

        debug!(
            "{:?} message complete: {} bytes in {} fragment(s)",
            header.opcode,
            payload.len(),
            fragment_count
        );

        Ok(Some(Decoded::Message(Message {
            opcode: header.opcode,
            compressed,
            payload,
        })))
    }
}

fn validate_close_payload(payload: &[u8]) -> Result<()> {
    match payload.len() {
        0 => return Ok(()),
        1 => return Err(FrameError::InvalidClosePayload),
        _ => {}
    }
    let code = u16::from_be_bytes([payload[0], payload[1]]);
    if !is_valid_close_code(code) {
        return Err(FrameError::InvalidCloseCode(code));
    }
    if !is_valid_utf8(&payload[2..]) {
        return Err(FrameError::InvalidUtf8);
    }
    Ok(())
}

/// Joins fragments into one buffer sized to `total_len`. A lone fragment is
/// returned without copying.
fn concat(mut fragments: Vec<Bytes>, total_len: u64) -> Bytes {
    match fragments.len() {
        0 => Bytes::new(),
        1 => fragments.pop().unwrap_or_default(),
        _ => {
            let copied: usize = fragments.iter().map(Bytes::len).sum();
            let len = usize::try_from(total_len).map_or(copied, |total| total.min(copied));
            let mut target = BytesMut::with_capacity(copied);
            for fragment in &fragments {
                target.extend_from_slice(fragment);
            }
            target.truncate(len);
            target.freeze()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masked_frame(first: u8, payload: &[u8], key: MaskKey) -> Vec<u8> {
        assert!(payload.len() <= 125);
        let mut out = vec![first, 0x80 | payload.len() as u8];
        out.extend_from_slice(&key);
        let mut body = payload.to_vec();
        apply_mask(&mut body, &key);
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn single_masked_text_message() {
        let mut codec = FrameCodec::new(0);
        let frame = masked_frame(0x81, b"Hello", [0x37, 0xfa, 0x21, 0x3d]);
        let decoded = codec.decode(&frame).unwrap();
        assert_eq!(
            decoded,
            Decoded::Message(Message {
                opcode: Opcode::Text,
                compressed: false,
                payload: Bytes::from_static(b"Hello"),
            })
        );
        assert_eq!(codec.buffered_bytes(), 0);
        assert_eq!(codec.total_payload_length(), 0);
    }

    #[test]
    fn state_resets_after_fin() {
        let mut codec = FrameCodec::new(0);
        assert_eq!(
            codec.decode(&[0x01, 0x03, b'a', b'b', b'c']).unwrap(),
            Decoded::Incomplete
        );
        assert!(codec.is_fragmented());
        assert_eq!(codec.fragment_count(), 1);
        assert_eq!(codec.total_payload_length(), 3);
        assert_eq!(codec.message_length(), 3);

        let done = codec.decode(&[0x80, 0x02, b'd', b'e']).unwrap();
        let Decoded::Message(message) = done else {
            panic!("expected a message");
        };
        assert_eq!(message.as_text(), Some("abcde"));
        assert!(!codec.is_fragmented());
        assert_eq!(codec.fragment_count(), 0);
        assert_eq!(codec.total_payload_length(), 0);
        assert_eq!(codec.message_length(), 0);
    }

    #[test]
    fn error_poisons_codec() {
        let mut codec = FrameCodec::new(0);
        assert_eq!(codec.decode(&[0x80, 0x00]), Err(FrameError::UnexpectedContinuation));
        assert!(codec.is_poisoned());
        assert_eq!(codec.decode(&[0x81, 0x00]), Err(FrameError::Poisoned));
    }

    #[test]
    fn close_payload_checks() {
        let mut codec = FrameCodec::new(0);
        assert_eq!(codec.decode(&[0x88, 0x01, 0x03]), Err(FrameError::InvalidClosePayload));

        let mut codec = FrameCodec::new(0);
        let decoded = codec.decode(&[0x88, 0x04, 0x03, 0xE8, b'o', b'k']).unwrap();
        let Decoded::Control(close) = decoded else {
            panic!("expected a control frame");
        };
        assert_eq!(close.close_code(), Some(1000));
        assert_eq!(close.close_reason(), Some("ok"));

        // 1005 (0x03ED) and 1006 are local-only and never valid on the wire.
        for code in [0u16, 999, 1005, 1006, 1015] {
            let mut frame = vec![0x88, 0x02];
            frame.extend_from_slice(&code.to_be_bytes());
            let mut codec = FrameCodec::new(0);
            assert_eq!(codec.decode(&frame), Err(FrameError::InvalidCloseCode(code)));
        }
    }

    #[test]
    fn concat_trims_to_length() {
        let parts = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd")];
        assert_eq!(&concat(parts.clone(), 4)[..], b"abcd");
        assert_eq!(&concat(parts, 3)[..], b"abc");
        assert!(concat(Vec::new(), 0).is_empty());
    }
}
