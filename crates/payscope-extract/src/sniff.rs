const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Sniffs the field delimiter from the first line by picking whichever
/// candidate splits it into the most fields. Falls back to comma on a tie
/// or when no candidate appears at all (spec.md §4.3 sniff-ambiguity
/// fallback).
pub fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or("");
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|&d| first_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| first_line.bytes().any(|b| b == d))
        .unwrap_or(b',')
}

/// Decodes raw bytes as UTF-8 if valid; otherwise detects the likely
/// encoding and transcodes, falling back to UTF-8 lossy decoding if
/// detection itself is inconclusive.
pub fn decode_bytes(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comma_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
    }

    #[test]
    fn detects_semicolon_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
    }

    #[test]
    fn falls_back_to_comma_when_ambiguous() {
        assert_eq!(detect_delimiter("just one column"), b',');
    }

    #[test]
    fn decodes_valid_utf8_directly() {
        assert_eq!(decode_bytes("héllo".as_bytes()), "héllo");
    }
}
