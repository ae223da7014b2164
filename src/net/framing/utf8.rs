/// Strict UTF-8 check over a finished message.
///
/// Rejects truncated sequences, bad continuation bytes, overlong forms,
/// UTF-16 surrogates (U+D800..U+DFFF) and anything above U+10FFFF.
pub fn is_valid_utf8(buf: &[u8]) -> bool {
    let len = buf.len();
    let mut i = 0;

    while i < len {
        let lead = buf[i];
        let width = match lead {
            // 0xxxxxxx
            0x00..=0x7F => 1,
            // 110xxxxx 10xxxxxx, 0xC0/0xC1 would be overlong
            0xC2..=0xDF => 2,
            // 1110xxxx 10xxxxxx 10xxxxxx
            0xE0..=0xEF => 3,
            // 11110xxx 10xxxxxx 10xxxxxx 10xxxxxx, above 0xF4 is past U+10FFFF
            0xF0..=0xF4 => 4,
            _ => return false,
        };

        if width == 1 {
            i += 1;
            continue;
        }
        if i + width > len {
            return false;
        }
        if !buf[i + 1..i + width].iter().all(|&b| is_continuation(b)) {
            return false;
        }

        let second = buf[i + 1];
        let in_range = match lead {
            0xE0 => second >= 0xA0,
            0xED => second < 0xA0,
            0xF0 => second >= 0x90,
            0xF4 => second <= 0x8F,
            _ => true,
        };
        if !in_range {
            return false;
        }

        i += width;
    }

    true
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agrees_with_std_on_samples() {
        let samples: &[&[u8]] = &[
            b"",
            b"plain ascii",
            "κόσμε".as_bytes(),
            "日本語テキスト".as_bytes(),
            "🦀 crab".as_bytes(),
            &[0xC0, 0xAF],
            &[0xE0, 0x80, 0xAF],
            &[0xED, 0xA0, 0x80],
            &[0xF4, 0x90, 0x80, 0x80],
            &[0xF8, 0x88, 0x80, 0x80, 0x80],
            &[0xE2, 0x82],
            &[0x80],
        ];
        for sample in samples {
            assert_eq!(
                is_valid_utf8(sample),
                std::str::from_utf8(sample).is_ok(),
                "sample {:02x?}",
                sample
            );
        }
    }

    #[test]
    fn bad_continuation_in_last_position() {
        assert!(!is_valid_utf8(&[0xE2, 0x82, 0x2C]));
        assert!(!is_valid_utf8(&[0xF0, 0x9F, 0xA6, 0x41]));
    }
}
