//! yEnc decoding
//!
//! The decoder consumes a line-oriented stream and produces an attached
//! binary [`Content`]. Resilience beats strictness here: out-of-order
//! keywords are ignored, corrupt lines are counted and skipped, and only
//! the footer checksum decides whether the payload is valid.

use std::io::{BufRead, Seek, SeekFrom};

use tracing::{debug, warn};

use crate::content::{Content, ContentKind};
use crate::error::Result;
use crate::yenc::CodecYenc;
use crate::yenc::line::{KeywordKind, KeywordLine, LineClass, classify};

impl CodecYenc {
    /// Decode one yEnc frame from `stream`.
    ///
    /// Returns `Ok(Some(content))` once a complete frame (through `=yend`)
    /// has been consumed; the content's validity reflects the checksum
    /// reconciliation. Returns `Ok(None)` when the stream ran out first, a
    /// duplicate keyword forced a rewind to the line start, or the decode
    /// byte cap was hit; partially decoded content stays buffered and can be
    /// claimed with [`CodecYenc::take_decoded`].
    pub fn decode<R: BufRead + Seek>(&mut self, stream: &mut R) -> Result<Option<Content>> {
        let mut line = Vec::with_capacity(256);

        loop {
            let pos = stream.stream_position()?;
            line.clear();
            let n = stream.read_until(b'\n', &mut line)?;
            if n == 0 {
                // Out of data for now; the caller may feed more later.
                return Ok(None);
            }
            self.total_lines += 1;

            match classify(&line) {
                LineClass::Keyword(keyword) => {
                    if self.meta.contains(keyword.kind) {
                        // Same keyword twice in one frame: rewind so the next
                        // decode starts a fresh frame on this line.
                        stream.seek(SeekFrom::Start(pos))?;
                        self.total_lines -= 1;
                        return Ok(None);
                    }
                    if let Some(finished) = self.apply_keyword(keyword)? {
                        return Ok(Some(finished));
                    }
                }
                LineClass::Corrupt => {
                    self.corrupt_lines += 1;
                    warn!("yEnc corruption detected on line {}", self.total_lines);
                }
                LineClass::Payload => {
                    if !self.meta.started() {
                        // Haven't found the frame start yet; keep scanning.
                        continue;
                    }
                    let bytes = decode_line(&line, &mut self.escape);
                    self.crc.update(&bytes);
                    self.decoded_bytes += bytes.len() as u64;
                    if let Some(content) = self.decoded.as_mut() {
                        content.write(&bytes)?;
                    }

                    if self.max_bytes() > 0 && self.decoded_bytes >= self.max_bytes() {
                        // Cap reached; drain the input so the caller does not
                        // mistake the remainder for another frame.
                        stream.seek(SeekFrom::End(0))?;
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Claim whatever content has been decoded so far, e.g. after a stream
    /// ended without `=yend`. Its validity flag will be unset.
    pub fn take_decoded(&mut self) -> Option<Content> {
        let mut content = self.decoded.take()?;
        let _ = content.close();
        self.reset_frame();
        Some(content)
    }

    fn apply_keyword(&mut self, keyword: KeywordLine) -> Result<Option<Content>> {
        match keyword.kind {
            KeywordKind::Begin => {
                let Some(name) = keyword.name.clone() else {
                    // A begin with no name cannot allocate a target; junk.
                    return Ok(None);
                };
                self.part_no = keyword.part.unwrap_or(1).max(1);
                let total_parts = keyword.total.unwrap_or(self.part_no).max(self.part_no);

                let mut content = Content::new(self.work_dir())
                    .with_kind(ContentKind::Binary)
                    .with_filename(&name)
                    .with_part(self.part_no, total_parts)?;
                if let Some(size) = keyword.size {
                    content = content.with_total_size(size);
                }
                debug!("Decoding {content}");
                self.decoded = Some(content);
                self.meta.begin = Some(keyword);
            }
            KeywordKind::Part => {
                if self.meta.begin.is_none() {
                    // A part with no begin is a mangled message; skip it.
                    return Ok(None);
                }
                if let Some(part) = keyword.part {
                    self.part_no = part.max(1);
                }
                if let Some(content) = self.decoded.as_mut() {
                    content.set_part(self.part_no);
                    if let (Some(begin), Some(end)) = (keyword.begin, keyword.end) {
                        if begin >= 1 {
                            // wire offsets are 1-based
                            content.set_span(begin - 1, end);
                        }
                    }
                }
                self.meta.part = Some(keyword);
            }
            KeywordKind::End => {
                if !self.meta.started() {
                    // An end before any begin/part; ignore and keep going.
                    return Ok(None);
                }
                return self.finish_frame(keyword).map(Some);
            }
        }
        Ok(None)
    }

    fn finish_frame(&mut self, keyword: KeywordLine) -> Result<Content> {
        let actual = format!("{:08x}", self.crc.clone().finalize());
        let Some(mut content) = self.decoded.take() else {
            // begin never allocated a target (e.g. nameless); produce an
            // empty, invalid placeholder so the caller sees the frame end.
            let mut content = Content::new(self.work_dir());
            content.set_valid(false);
            self.reset_frame();
            return Ok(content);
        };

        let mut valid = true;
        if let Some(expected) = &keyword.pcrc32 {
            if !expected.eq_ignore_ascii_case(&actual) {
                warn!("CRC mismatch for {content}: expected {expected}, got {actual}");
                self.corrupt_lines += 1;
                valid = false;
            }
        }
        if let Some(size) = keyword.size {
            if size != self.decoded_bytes {
                warn!(
                    "Size mismatch for {content}: expected {size}, got {}",
                    self.decoded_bytes,
                );
                valid = false;
            }
        }

        content.set_wire_crc32(keyword.crc32.clone());
        content.set_valid(valid);
        content.close()?;
        self.meta.end = Some(keyword);
        self.reset_frame();
        Ok(content)
    }
}

/// Decode one payload line, updating the escape carry bit.
///
/// Line terminators are discarded; a line ending on `'='` carries its escape
/// into the first byte of the next line.
pub(crate) fn decode_line(line: &[u8], escape: &mut bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(line.len());
    for &b in line {
        match b {
            b'\r' | b'\n' => {}
            b'=' if !*escape => *escape = true,
            _ => {
                let value = if *escape {
                    *escape = false;
                    b.wrapping_sub(64)
                } else {
                    b
                };
                out.push(value.wrapping_sub(42));
            }
        }
    }
    out
}
