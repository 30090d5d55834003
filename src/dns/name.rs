//! RFC1035 label wire format and the compression-pointer search used by
//! the loop-detecting chain in [`super::session`].

use super::DnsError;

const MAX_LABEL_LEN: usize = 63;
const POINTER_TAG: u16 = 0xC000;

/// Encodes `fqdn` as `len(L):1 | L:len(L)` per label, terminated by the
/// zero-length root label.
pub fn encode_name(fqdn: &str) -> Result<Vec<u8>, DnsError> {
    let mut buf = Vec::new();
    for label in fqdn.trim_end_matches('.').split('.') {
        if label.is_empty() {
            continue;
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::LabelTooLong);
        }
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
    Ok(buf)
}

/// Finds the byte offset of `needle` inside `haystack`, for compression.
pub fn find_offset(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Builds the 2-byte compression pointer `0xC000 | offset`.
pub fn pointer(offset: usize) -> Vec<u8> {
    let value = POINTER_TAG | (offset as u16 & 0x3FFF);
    value.to_be_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_labels_with_root_terminator() {
        let encoded = encode_name("a.example.com.").unwrap();
        assert_eq!(encoded[0], 1);
        assert_eq!(&encoded[1..2], b"a");
        assert_eq!(*encoded.last().unwrap(), 0);
    }

    #[test]
    fn label_length_boundary() {
        let ok = "a".repeat(63);
        assert!(encode_name(&format!("{ok}.example.com.")).is_ok());
        let too_long = "a".repeat(64);
        assert!(matches!(
            encode_name(&format!("{too_long}.example.com.")),
            Err(DnsError::LabelTooLong)
        ));
    }

    #[test]
    fn pointer_sets_compression_tag_bits() {
        let p = pointer(12);
        assert_eq!(u16::from_be_bytes([p[0], p[1]]), 0xC00C);
    }

    #[test]
    fn find_offset_locates_subsequence() {
        let haystack = [1, b'a', 0, 1, b'b', 0];
        assert_eq!(find_offset(&haystack, &[1, b'b', 0]), Some(3));
        assert_eq!(find_offset(&haystack, &[1, b'z', 0]), None);
    }
}
