/// Copy `src` into a zeroed array of `N` bytes, truncating anything that does not fit.
pub fn to_fixed<const N: usize>(src: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let len = src.len().min(N);
    out[..len].copy_from_slice(&src[..len]);
    out
}

/// Bytes of a zero padded field up to the first NUL.
pub fn trim_nul(src: &[u8]) -> &[u8] {
    let end = src.iter().position(|b| *b == 0).unwrap_or(src.len());
    &src[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"", [0, 0, 0, 0])]
    #[case(b"ab", [b'a', b'b', 0, 0])]
    #[case(b"abcdef", [b'a', b'b', b'c', b'd'])]
    fn pads_and_truncates(#[case] src: &[u8], #[case] expected: [u8; 4]) {
        assert_eq!(to_fixed::<4>(src), expected);
    }

    #[test]
    fn trims_at_first_nul() {
        assert_eq!(trim_nul(b"1.0.0\0\0\0"), b"1.0.0");
        assert_eq!(trim_nul(b"full"), b"full");
    }
}
