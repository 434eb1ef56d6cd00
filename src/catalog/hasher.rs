/// BLAKE3 digest over several byte buffers, in order. Each buffer is
/// prefixed with its length so boundaries cannot shift.
pub fn fingerprint(parts: &[&[u8]]) -> String {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hasher.finalize().to_hex().to_string()
}

/// First 12 hex digits, for log lines.
pub fn short(fingerprint: &str) -> &str {
    &fingerprint[..fingerprint.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_contents_same_fingerprint() {
        let a = fingerprint(&[b"table".as_slice(), b"matrix".as_slice()]);
        assert_eq!(a, fingerprint(&[b"table".as_slice(), b"matrix".as_slice()]));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn moving_bytes_between_parts_changes_fingerprint() {
        assert_ne!(
            fingerprint(&[b"ab".as_slice(), b"c".as_slice()]),
            fingerprint(&[b"a".as_slice(), b"bc".as_slice()])
        );
    }

    #[test]
    fn short_form_is_a_prefix() {
        let fp = "0123456789abcdef";
        assert_eq!(short(fp), "0123456789ab");
        assert_eq!(short("abc"), "abc");
    }
}
