//! yEnc encoding
//!
//! Streams a binary [`Content`] part into its wire form: the three framing
//! lines plus the escaped payload wrapped at the configured line length. A
//! part split from a still-living parent additionally carries the parent's
//! whole-file CRC32 in its footer.

use std::io::Read;

use tracing::debug;

use crate::content::{Content, ContentKind, FileMode};
use crate::error::{Error, Result};
use crate::yenc::{CodecYenc, EOL};

impl CodecYenc {
    /// Encode `content` into a fresh attached ASCII content, reading
    /// `mem_buf` bytes at a time.
    pub fn encode(&self, content: &mut Content, mem_buf: usize) -> Result<Content> {
        if mem_buf == 0 {
            return Err(Error::InvalidSize {
                field: "mem_buf",
                value: 0,
            });
        }

        let size = content.length()?;
        let begin = content.begin();
        let end = content.end()?;
        let part = content.part();
        let total_parts = content.total_parts();
        let line_len = self.line_len();

        let mut encoded = Content::new(self.work_dir())
            .with_kind(ContentKind::Ascii)
            .with_filename(content.filename())
            .with_sort_no(content.sort_no())
            .with_part(part, total_parts)?
            .with_unique_tag();

        let pcrc32 = content.crc32()?;
        let whole_crc32 = content.parent_crc32()?;

        let ybegin = format!(
            "=ybegin part={part} total={total_parts} line={line_len} size={size} name={name}",
            name = content.filename(),
        );
        // offsets on the wire are 1-based; the end is derived from the part's
        // actual length so the final part never overruns
        let ypart = format!("=ypart begin={} end={}", begin + 1, end);
        let yend = match &whole_crc32 {
            Some(crc32) => {
                format!("=yend size={size} part={part} pcrc32={pcrc32} crc32={crc32}")
            }
            None => format!("=yend size={size} part={part} pcrc32={pcrc32}"),
        };

        encoded.write(ybegin.as_bytes())?;
        encoded.write(EOL.as_bytes())?;
        encoded.write(ypart.as_bytes())?;
        encoded.write(EOL.as_bytes())?;

        content.open(FileMode::Read, false)?;
        let mut buf = vec![0u8; mem_buf];
        let mut out: Vec<u8> = Vec::with_capacity(mem_buf + mem_buf / 16);
        let mut column = 0usize;
        loop {
            let got = Read::read(content, &mut buf)?;
            if got == 0 {
                break;
            }
            for &b in &buf[..got] {
                encode_byte(b, &mut out, &mut column, line_len);
            }
            encoded.write(&out)?;
            out.clear();
        }
        content.close()?;

        if column > 0 {
            encoded.write(EOL.as_bytes())?;
        }
        encoded.write(yend.as_bytes())?;
        encoded.write(EOL.as_bytes())?;
        encoded.close()?;

        debug!("Encoded {content} ({size} bytes)");
        Ok(encoded)
    }
}

/// Encode one raw byte, wrapping lines at `line_len` encoded characters.
///
/// NUL, CR, LF and '=' always escape; space and tab escape when they would
/// start or end a line; '.' escapes at line start. A line never ends on the
/// '=' escape lead, so a pair that would straddle the boundary is pulled
/// whole onto the next line.
fn encode_byte(b: u8, out: &mut Vec<u8>, column: &mut usize, line_len: usize) {
    if *column >= line_len {
        out.extend_from_slice(EOL.as_bytes());
        *column = 0;
    }

    let v = b.wrapping_add(42);
    let escape = matches!(v, 0x00 | b'\r' | b'\n' | b'=')
        || ((v == b' ' || v == b'\t') && (*column == 0 || *column + 1 == line_len))
        || (v == b'.' && *column == 0);

    if escape {
        if *column + 2 > line_len {
            out.extend_from_slice(EOL.as_bytes());
            *column = 0;
        }
        out.push(b'=');
        out.push(v.wrapping_add(64));
        *column += 2;
    } else {
        out.push(v);
        *column += 1;
    }
}
