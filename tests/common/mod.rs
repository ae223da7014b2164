#![allow(dead_code)]

use ws_framing::net::framing::mask::{apply_mask, MaskKey};
use ws_framing::{Decoded, FrameCodec, Message};

/// Builds one client frame. `first` is the full first header byte.
pub fn frame(first: u8, payload: &[u8], mask: Option<MaskKey>) -> Vec<u8> {
    let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
    let mut out = vec![first];

    let len = payload.len();
    if len <= 125 {
        out.push(mask_bit | len as u8);
    } else if len < 65536 {
        out.push(mask_bit | 126);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    } else {
        out.push(mask_bit | 127);
        out.extend_from_slice(&(len as u64).to_be_bytes());
    }

    let mut body = payload.to_vec();
    if let Some(key) = mask {
        out.extend_from_slice(&key);
        apply_mask(&mut body, &key);
    }
    out.extend_from_slice(&body);
    out
}

/// Splits `payload` into `parts` frames: data opcode first, continuations
/// after, FIN only on the last.
pub fn fragmented(opcode: u8, payload: &[u8], parts: usize, mask: Option<MaskKey>) -> Vec<u8> {
    let parts = parts.max(1);
    let size = payload.len().div_ceil(parts).max(1);
    let chunks: Vec<&[u8]> = if payload.is_empty() {
        vec![&[]]
    } else {
        payload.chunks(size).collect()
    };

    let mut out = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let op = if i == 0 { opcode } else { 0x00 };
        let fin = if i + 1 == chunks.len() { 0x80 } else { 0x00 };
        out.extend(frame(fin | op, chunk, mask));
    }
    out
}

/// Feeds `bytes` in pieces of `step` and collects everything decoded.
pub fn decode_in_steps(codec: &mut FrameCodec, bytes: &[u8], step: usize) -> Vec<Decoded> {
    let mut out = Vec::new();
    for piece in bytes.chunks(step.max(1)) {
        let mut next = codec.decode(piece).expect("decode failed");
        while next != Decoded::Incomplete {
            out.push(next);
            next = codec.decode(&[]).expect("decode failed");
        }
    }
    out
}

pub fn expect_message(decoded: Decoded) -> Message {
    match decoded {
        Decoded::Message(message) => message,
        other => panic!("expected a message, got {:?}", other),
    }
}
