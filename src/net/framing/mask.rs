pub const MASK_KEY_LEN: usize = 4;

pub type MaskKey = [u8; MASK_KEY_LEN];

/// XORs `buf` in place with `key`, cycling on `i & 3`.
/// Applying the same key twice restores the input.
pub fn apply_mask(buf: &mut [u8], key: &MaskKey) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= key[i & 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc_example() {
        // RFC 6455 5.7: masked "Hello"
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let mut payload = [0x7f, 0x9f, 0x4d, 0x51, 0x58];
        apply_mask(&mut payload, &key);
        assert_eq!(&payload, b"Hello");
    }

    #[test]
    fn involution() {
        let key = [0xde, 0xad, 0xbe, 0xef];
        let original = b"mask me twice, get me back".to_vec();
        let mut buf = original.clone();
        apply_mask(&mut buf, &key);
        assert_ne!(buf, original);
        apply_mask(&mut buf, &key);
        assert_eq!(buf, original);
    }
}
