mod common;

use common::{expect_message, frame};
use ws_framing::net::framing::is_valid_utf8;
use ws_framing::{FrameCodec, FrameError};

#[test]
fn boundary_code_points_accepted() {
    let boundaries = [
        '\u{0}', '\u{7F}', '\u{80}', '\u{7FF}', '\u{800}', '\u{FFFF}', '\u{10000}', '\u{10FFFF}',
    ];
    for c in boundaries {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        assert!(is_valid_utf8(encoded.as_bytes()), "U+{:04X}", c as u32);
    }
}

#[test]
fn surrounding_surrogates_accepted() {
    // U+D7FF and U+E000 sit right next to the surrogate block.
    assert!(is_valid_utf8(&[0xED, 0x9F, 0xBF]));
    assert!(is_valid_utf8(&[0xEE, 0x80, 0x80]));
}

#[test]
fn invalid_patterns_rejected() {
    let cases: &[(&str, &[u8])] = &[
        ("overlong 2-byte C0", &[0xC0, 0x80]),
        ("overlong 2-byte C1", &[0xC1, 0xBF]),
        ("overlong 3-byte", &[0xE0, 0x9F, 0xBF]),
        ("overlong 4-byte", &[0xF0, 0x8F, 0xBF, 0xBF]),
        ("surrogate low edge", &[0xED, 0xA0, 0x80]),
        ("surrogate high edge", &[0xED, 0xBF, 0xBF]),
        ("above U+10FFFF via F4", &[0xF4, 0x90, 0x80, 0x80]),
        ("above U+10FFFF via F5", &[0xF5, 0x80, 0x80, 0x80]),
        ("lead byte F8", &[0xF8, 0x88, 0x80, 0x80, 0x80]),
        ("lead byte FF", &[0xFF]),
        ("lone continuation", &[0x80]),
        ("truncated 2-byte", &[0xC3]),
        ("truncated 3-byte", &[0xE2, 0x82]),
        ("truncated 4-byte", &[0xF0, 0x9F, 0x98]),
        ("bad continuation", &[0xC3, 0x28]),
        ("ascii then truncated", &[b'o', b'k', 0xE2]),
    ];

    for (name, bytes) in cases {
        assert!(!is_valid_utf8(bytes), "{name} should be rejected");
    }
}

#[test]
fn decoder_rejects_truncated_text_message() {
    let mut codec = FrameCodec::new(0);
    assert_eq!(
        codec.decode(&frame(0x81, &[b'a', 0xF0, 0x9F], Some([1, 2, 3, 4]))),
        Err(FrameError::InvalidUtf8)
    );
}

#[test]
fn decoder_accepts_max_code_point() {
    let mut codec = FrameCodec::new(0);
    let text = "\u{10FFFF}";
    let message = expect_message(codec.decode(&frame(0x81, text.as_bytes(), None)).unwrap());
    assert_eq!(message.as_text(), Some(text));
}

#[test]
fn close_reason_must_be_utf8() {
    let mut codec = FrameCodec::new(0);
    assert_eq!(
        codec.decode(&frame(0x88, &[0x03, 0xE8, 0xC0, 0x80], None)),
        Err(FrameError::InvalidUtf8)
    );
}
