//! Input records and key extraction
//!
//! Each input line is a credential fingerprint, optionally followed by extra
//! data such as `:count`. Only the first `key_length` characters are indexed.

/// Characters of each record that form the filter key.
///
/// 40 is the length of a hex-encoded SHA-1 digest. The lookup tool must
/// truncate candidates to the same length, so the value is persisted with
/// every filter.
pub const CREDENTIAL_KEY_LENGTH: usize = 40;

/// Strip a trailing `\n` or `\r\n` from a raw line
pub fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Return the bytes of the first `key_length` characters of a record,
/// or `None` if the record is shorter than that.
///
/// Characters are UTF-8 scalar values. Invalid UTF-8 after the key does not
/// matter; invalid UTF-8 inside it ends the record early.
pub fn extract_key(record: &[u8], key_length: usize) -> Option<&[u8]> {
    // Hex digests are ASCII: one byte per character
    if let Some(prefix) = record.get(..key_length) {
        if prefix.is_ascii() {
            return Some(prefix);
        }
    }

    let text = valid_utf8_prefix(record);
    match text.char_indices().nth(key_length) {
        Some((end, _)) => Some(&record[..end]),
        None if text.chars().count() == key_length => Some(text.as_bytes()),
        None => None,
    }
}

/// Length of a record in characters, as reported for malformed records
pub fn record_length(record: &[u8]) -> usize {
    valid_utf8_prefix(record).chars().count()
}

fn valid_utf8_prefix(record: &[u8]) -> &str {
    match std::str::from_utf8(record) {
        Ok(text) => text,
        // valid_up_to marks a char boundary, so this cannot fail
        Err(err) => std::str::from_utf8(&record[..err.valid_up_to()]).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1: &str = "000000005AD76BD555C1D6D771DE417A4B87E4B4";

    #[test]
    fn test_exact_length_record_is_its_own_key() {
        assert_eq!(SHA1.len(), CREDENTIAL_KEY_LENGTH);
        assert_eq!(
            extract_key(SHA1.as_bytes(), CREDENTIAL_KEY_LENGTH),
            Some(SHA1.as_bytes())
        );
    }

    #[test]
    fn test_suffix_is_ignored() {
        let line = format!("{}:3861493", SHA1);
        assert_eq!(
            extract_key(line.as_bytes(), CREDENTIAL_KEY_LENGTH),
            Some(SHA1.as_bytes())
        );
    }

    #[test]
    fn test_short_record_has_no_key() {
        let short = &SHA1[..39];
        assert_eq!(extract_key(short.as_bytes(), CREDENTIAL_KEY_LENGTH), None);
        assert_eq!(record_length(short.as_bytes()), 39);
        assert_eq!(extract_key(b"", CREDENTIAL_KEY_LENGTH), None);
    }

    #[test]
    fn test_multibyte_characters_count_once() {
        let line = "é".repeat(40) + "tail";
        let key = extract_key(line.as_bytes(), CREDENTIAL_KEY_LENGTH).unwrap();
        assert_eq!(key.len(), 80);
        assert_eq!(std::str::from_utf8(key).unwrap(), "é".repeat(40));

        let exact = "é".repeat(40);
        assert_eq!(
            extract_key(exact.as_bytes(), CREDENTIAL_KEY_LENGTH),
            Some(exact.as_bytes())
        );

        let short = "é".repeat(39);
        assert_eq!(extract_key(short.as_bytes(), CREDENTIAL_KEY_LENGTH), None);
        assert_eq!(record_length(short.as_bytes()), 39);
    }

    #[test]
    fn test_invalid_utf8_after_key_is_ignored() {
        let mut line = SHA1.as_bytes().to_vec();
        line.extend_from_slice(&[0xFF, 0xFE]);
        assert_eq!(
            extract_key(&line, CREDENTIAL_KEY_LENGTH),
            Some(SHA1.as_bytes())
        );
    }

    #[test]
    fn test_trim_line_ending() {
        assert_eq!(trim_line_ending(b"abc\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc\r\n"), b"abc");
        assert_eq!(trim_line_ending(b"abc"), b"abc");
        assert_eq!(trim_line_ending(b"\n"), b"");
    }
}
