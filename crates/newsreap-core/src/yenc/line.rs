//! yEnc keyword-line mini-language
//!
//! Handles classification and parsing of the `=ybegin`, `=ypart` and
//! `=yend` framing lines. Parsing is tolerant by design: unknown keys are
//! ignored and unparseable integers are dropped rather than failing the
//! line, because real-world posts get this format wrong in every way
//! imaginable.

/// Which framing keyword a line carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeywordKind {
    Begin,
    Part,
    End,
}

/// A parsed keyword line; only the fields present on the line are set.
#[derive(Debug, Clone)]
pub(crate) struct KeywordLine {
    pub(crate) kind: KeywordKind,
    pub(crate) part: Option<u32>,
    pub(crate) total: Option<u32>,
    pub(crate) line: Option<usize>,
    pub(crate) size: Option<u64>,
    pub(crate) name: Option<String>,
    pub(crate) begin: Option<u64>,
    pub(crate) end: Option<u64>,
    pub(crate) pcrc32: Option<String>,
    pub(crate) crc32: Option<String>,
}

impl KeywordLine {
    fn new(kind: KeywordKind) -> Self {
        Self {
            kind,
            part: None,
            total: None,
            line: None,
            size: None,
            name: None,
            begin: None,
            end: None,
            pcrc32: None,
            crc32: None,
        }
    }
}

/// What a raw article line means to the decoder.
#[derive(Debug)]
pub(crate) enum LineClass {
    /// A well-formed framing line.
    Keyword(KeywordLine),
    /// Looked like a framing line but failed to parse; counted and skipped.
    Corrupt,
    /// Everything else is payload.
    Payload,
}

/// Classify a raw line (terminator included) from an article stream.
pub(crate) fn classify(raw: &[u8]) -> LineClass {
    let trimmed = raw.trim_ascii_start();
    let Some((kind, rest)) = match_keyword(trimmed) else {
        return LineClass::Payload;
    };
    match parse_fields(kind, rest) {
        Some(keyword) => LineClass::Keyword(keyword),
        None => LineClass::Corrupt,
    }
}

fn match_keyword(line: &[u8]) -> Option<(KeywordKind, &[u8])> {
    const KEYWORDS: [(&str, KeywordKind); 3] = [
        ("=ybegin", KeywordKind::Begin),
        ("=ypart", KeywordKind::Part),
        ("=yend", KeywordKind::End),
    ];

    for (prefix, kind) in KEYWORDS {
        if line.len() < prefix.len()
            || !line[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        {
            continue;
        }
        let mut rest = &line[prefix.len()..];
        // tolerate the yEnc2 variant marker
        if rest.first() == Some(&b'2') {
            rest = &rest[1..];
        }
        // The keyword must stand alone; "=ybeginx" is payload.
        return match rest.first() {
            None | Some(b' ' | b'\t' | b'\r' | b'\n') => Some((kind, rest)),
            _ => None,
        };
    }
    None
}

fn parse_fields(kind: KeywordKind, rest: &[u8]) -> Option<KeywordLine> {
    let rest = String::from_utf8_lossy(rest);
    let mut keyword = KeywordLine::new(kind);

    let mut cursor = rest.trim();
    while !cursor.is_empty() {
        let eq = cursor.find('=')?;
        let key = cursor[..eq].trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return None;
        }
        let key = key.to_ascii_lowercase();
        let after = &cursor[eq + 1..];

        // name= owns the remainder of the line
        if key == "name" {
            let name = after.trim().trim_matches(['"', '\'']);
            let name = name
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(name)
                .trim()
                .to_string();
            if !name.is_empty() {
                keyword.name = Some(name);
            }
            break;
        }

        let (value, next) = match after.find(char::is_whitespace) {
            Some(ws) => (&after[..ws], &after[ws..]),
            None => (after, ""),
        };
        match key.as_str() {
            "part" => keyword.part = value.parse().ok(),
            "total" => keyword.total = value.parse().ok(),
            "line" => keyword.line = value.parse().ok(),
            "size" => keyword.size = value.parse().ok(),
            "begin" => keyword.begin = value.parse().ok(),
            "end" => keyword.end = value.parse().ok(),
            "pcrc32" => keyword.pcrc32 = hex_value(value),
            "crc32" => keyword.crc32 = hex_value(value),
            _ => {}
        }
        cursor = next.trim_start();
    }

    Some(keyword)
}

fn hex_value(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(value.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keyword(raw: &[u8]) -> KeywordLine {
        match classify(raw) {
            LineClass::Keyword(kw) => kw,
            other => panic!("expected keyword line, got {other:?}"),
        }
    }

    #[test]
    fn test_begin_line() {
        let kw = keyword(b"=ybegin part=1 total=2 line=128 size=524288 name=my file.bin\r\n");
        assert_eq!(kw.kind, KeywordKind::Begin);
        assert_eq!(kw.part, Some(1));
        assert_eq!(kw.total, Some(2));
        assert_eq!(kw.line, Some(128));
        assert_eq!(kw.size, Some(524288));
        assert_eq!(kw.name.as_deref(), Some("my file.bin"));
    }

    #[test]
    fn test_begin_name_strips_quotes_and_paths() {
        let kw = keyword(b"=ybegin line=128 size=9 name=\"path/to/file.bin\"\r\n");
        assert_eq!(kw.name.as_deref(), Some("file.bin"));
    }

    #[test]
    fn test_part_line() {
        let kw = keyword(b"=ypart begin=1 end=524288\r\n");
        assert_eq!(kw.kind, KeywordKind::Part);
        assert_eq!(kw.begin, Some(1));
        assert_eq!(kw.end, Some(524288));
    }

    #[test]
    fn test_end_line_with_whole_file_crc() {
        let kw = keyword(b"=yend size=524288 part=1 pcrc32=12A4F5B0 crc32=0918b242\r\n");
        assert_eq!(kw.kind, KeywordKind::End);
        assert_eq!(kw.size, Some(524288));
        assert_eq!(kw.pcrc32.as_deref(), Some("12a4f5b0"));
        assert_eq!(kw.crc32.as_deref(), Some("0918b242"));
    }

    #[test]
    fn test_case_insensitive_and_leading_whitespace() {
        let kw = keyword(b"  =YBEGIN LINE=128 SIZE=5 NAME=x\r\n");
        assert_eq!(kw.kind, KeywordKind::Begin);
        assert_eq!(kw.line, Some(128));
    }

    #[test]
    fn test_yenc2_marker_tolerated() {
        let kw = keyword(b"=ybegin2 line=128 size=5 name=x\r\n");
        assert_eq!(kw.kind, KeywordKind::Begin);
    }

    #[test]
    fn test_bad_integers_dropped_not_fatal() {
        let kw = keyword(b"=ybegin part=abc line=128 size=5 name=x\r\n");
        assert_eq!(kw.part, None);
        assert_eq!(kw.size, Some(5));
    }

    #[test]
    fn test_payload_lines() {
        assert!(matches!(classify(b"r8F1o2Tw\r\n"), LineClass::Payload));
        // escaped payload that merely starts with '='
        assert!(matches!(classify(b"=Jmore payload\r\n"), LineClass::Payload));
        // keyword prefix followed by junk is payload, not a keyword
        assert!(matches!(classify(b"=ybeginx foo\r\n"), LineClass::Payload));
    }

    #[test]
    fn test_corrupt_keyword_line() {
        assert!(matches!(classify(b"=ybegin part 1 name\r\n"), LineClass::Corrupt));
        assert!(matches!(classify(b"=yend bad token\r\n"), LineClass::Corrupt));
    }
}
