//! yEnc streaming codec
//!
//! yEnc is the line-oriented binary-to-text mapping used to ship binaries
//! over Usenet. Each byte `b` travels as `(b + 42) mod 256`; a handful of
//! wire-hostile results are escaped as `'=' + ((b + 42 + 64) mod 256)`.
//! Three keyword lines frame a payload:
//!
//! ```text
//! =ybegin part=1 total=2 line=128 size=524288 name=file.bin
//! =ypart begin=1 end=524288
//! <payload lines, at most `line` encoded characters each>
//! =yend size=524288 part=1 pcrc32=12a4f5b0 crc32=0918b242
//! ```
//!
//! `pcrc32` is the CRC32 of this part's raw bytes, `crc32` (when present)
//! the CRC32 of the whole file the part was split from. The decoder treats
//! the footer checksums as the authoritative integrity check: corrupt lines
//! are counted and skipped, never fatal.

mod decode;
mod encode;
mod line;
mod subject;

pub use subject::{ParsedSubject, parse_subject};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::content::Content;
use line::KeywordLine;

/// Line terminator emitted on the wire.
pub(crate) const EOL: &str = "\r\n";

/// Default number of encoded characters per payload line.
pub const DEFAULT_LINE_LEN: usize = 128;

/// Default working-buffer size for encode/decode streaming.
///
/// Larger buffers decode faster but the cost stacks across concurrently
/// running pipelines.
pub const DEFAULT_BUFFER_SIZE: usize = 1 << 20;

/// Keyword lines observed so far within the current frame.
#[derive(Debug, Default)]
pub(crate) struct FrameMeta {
    pub(crate) begin: Option<KeywordLine>,
    pub(crate) part: Option<KeywordLine>,
    pub(crate) end: Option<KeywordLine>,
}

impl FrameMeta {
    pub(crate) fn contains(&self, kind: line::KeywordKind) -> bool {
        match kind {
            line::KeywordKind::Begin => self.begin.is_some(),
            line::KeywordKind::Part => self.part.is_some(),
            line::KeywordKind::End => self.end.is_some(),
        }
    }

    /// Payload may only follow a `begin` (or `part`) keyword.
    pub(crate) fn started(&self) -> bool {
        self.begin.is_some() || self.part.is_some()
    }
}

/// Stateful yEnc encoder/decoder.
///
/// One codec handles one article stream at a time; state carries across
/// [`CodecYenc::decode`] calls so a frame may span several reads. Use
/// [`CodecYenc::reset`] before reusing the codec for an unrelated stream.
pub struct CodecYenc {
    work_dir: PathBuf,
    line_len: usize,
    max_bytes: u64,
    pub(crate) meta: FrameMeta,
    pub(crate) part_no: u32,
    pub(crate) crc: crc32fast::Hasher,
    pub(crate) escape: bool,
    pub(crate) total_lines: u64,
    pub(crate) corrupt_lines: u64,
    pub(crate) decoded_bytes: u64,
    pub(crate) decoded: Option<Content>,
}

impl CodecYenc {
    /// Create a codec whose scratch content lands under `work_dir`.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            line_len: DEFAULT_LINE_LEN,
            max_bytes: 0,
            meta: FrameMeta::default(),
            part_no: 1,
            crc: crc32fast::Hasher::new(),
            escape: false,
            total_lines: 0,
            corrupt_lines: 0,
            decoded_bytes: 0,
            decoded: None,
        }
    }

    /// Override the encoded characters emitted per payload line.
    pub fn with_line_len(mut self, line_len: usize) -> Self {
        self.line_len = line_len.max(16);
        self
    }

    /// Cap the number of bytes decoded; once reached the input stream is
    /// drained and decoding stops. `0` (the default) means no cap.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub(crate) fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub(crate) fn line_len(&self) -> usize {
        self.line_len
    }

    pub(crate) fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Parse a free-form Usenet subject line; see [`parse_subject`].
    pub fn parse_article(&self, subject: &str) -> Option<ParsedSubject> {
        parse_subject(subject)
    }

    /// Total lines consumed across all decode calls.
    pub fn total_lines(&self) -> u64 {
        self.total_lines
    }

    /// Corrupt lines (and checksum failures) seen across all decode calls.
    pub fn corrupt_lines(&self) -> u64 {
        self.corrupt_lines
    }

    /// Raw bytes decoded within the current frame.
    pub fn decoded_bytes(&self) -> u64 {
        self.decoded_bytes
    }

    /// Drop all decode state, including any partially decoded content and
    /// the line counters.
    pub fn reset(&mut self) {
        self.reset_frame();
        self.total_lines = 0;
        self.corrupt_lines = 0;
        self.decoded = None;
    }

    pub(crate) fn reset_frame(&mut self) {
        self.meta = FrameMeta::default();
        self.part_no = 1;
        self.crc = crc32fast::Hasher::new();
        self.escape = false;
        self.decoded_bytes = 0;
    }
}

impl fmt::Debug for CodecYenc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<CodecYenc lines_processed={} corrupt={} />",
            self.total_lines, self.corrupt_lines,
        )
    }
}
