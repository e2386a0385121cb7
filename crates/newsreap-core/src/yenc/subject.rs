//! Usenet subject-line parsing
//!
//! Binary posts carry their filename and part indexes in free-form subject
//! lines. There is no standard, only convention, so the matcher has to
//! tolerate quoting, bracket styles and an optional trailing size:
//!
//! ```text
//! description [x/y] - "fname" yEnc (a/b)
//! description - fname yEnc (a/b)
//! "fname" yEnc (/b) size
//! ```

use std::sync::LazyLock;

use regex::Regex;

static SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^((["'\s]*(?P<desc>(\s*[^"'\[(])+)(["'\s-]+[\[(]?(?P<index>\d+)/(?P<count>\d+)[)\]]?)?)?["'\s-]+)?(?P<fname>[^"']+)["'\s-]+yEnc\s+[\[(]?(?P<yindex>\d+)?/(?P<ycount>\d+)[\])]?([+\s]+?(?P<size>\s*\d+))?\s*$"#,
    )
    .expect("subject pattern compiles")
});

/// Fields recovered from a subject line; only what matched is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSubject {
    /// Free-form description ahead of the filename.
    pub desc: Option<String>,
    /// Archive-set index from a `[x/y]` marker.
    pub index: Option<u32>,
    /// Archive-set count from a `[x/y]` marker.
    pub count: Option<u32>,
    /// The filename itself.
    pub fname: Option<String>,
    /// yEnc part index from the `(a/b)` marker.
    pub yindex: Option<u32>,
    /// yEnc part count from the `(a/b)` marker.
    pub ycount: Option<u32>,
    /// Optional trailing byte size.
    pub size: Option<u64>,
}

/// Parse a subject line, returning whatever fields matched, or `None` when
/// the line does not look like a binary post at all.
pub fn parse_subject(subject: &str) -> Option<ParsedSubject> {
    let caps = SUBJECT_RE.captures(subject)?;

    let desc = caps.name("desc").map(|m| {
        m.as_str()
            .trim_end_matches(|c: char| c.is_whitespace() || c == '-')
            .to_string()
    });
    let fname = caps.name("fname").map(|m| m.as_str().trim().to_string());

    Some(ParsedSubject {
        desc: desc.filter(|d| !d.is_empty()),
        index: parse_num(&caps, "index"),
        count: parse_num(&caps, "count"),
        fname: fname.filter(|f| !f.is_empty()),
        yindex: parse_num(&caps, "yindex"),
        ycount: parse_num(&caps, "ycount"),
        size: parse_num(&caps, "size"),
    })
}

fn parse_num<T: std::str::FromStr>(caps: &regex::Captures<'_>, name: &str) -> Option<T> {
    caps.name(name)?.as_str().trim().parse().ok()
}
