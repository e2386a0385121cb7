//! Streaming payload container for article content
//!
//! A [`Content`] is one payload found within (or destined for) an article: a
//! whole file, or one part of a larger file. It behaves like a stream but
//! adds the operations needed to assemble and post binaries: append, split,
//! copy, save, hashing and block iteration.
//!
//! Content defaults to an *attached* role: backing files written to disk are
//! removed the moment the object is dropped. This is intentional. Call
//! [`Content::detach`] at any time to take over ownership of the file, after
//! which cleanup is your responsibility.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use tracing::{debug, error, warn};

use crate::error::{Error, Result};
use crate::util;

/// Maximum bytes pulled from a backing file in one chunk when streaming.
///
/// This bounds how much memory a single streaming operation occupies; raising
/// it trades memory for fewer syscalls when many tasks run concurrently.
pub const DEFAULT_BLOCK_SIZE: usize = 32_768;

/// Default sort tier for payload content.
///
/// Header-like entries use lower tiers so they order ahead of binaries when
/// mixed in one set. Grouped content should share a tier so it sorts
/// together.
pub const DEFAULT_SORT_NO: u32 = 10_000;

/// Sort tier used for header content extracted from a response.
pub const HEADER_SORT_NO: u32 = 100;

static UNIQUE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// How a backing file is opened.
///
/// Reopening with the mode already active is a repositioning no-op; a
/// different mode closes the stream and reopens it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Read-only.
    Read,
    /// Read/write without truncation; the file is created if missing.
    ReadWrite,
    /// Read/write, discarding any existing bytes.
    Truncate,
}

impl FileMode {
    fn options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self {
            FileMode::Read => {
                opts.read(true);
            }
            FileMode::ReadWrite => {
                opts.read(true).write(true).create(true);
            }
            FileMode::Truncate => {
                opts.read(true).write(true).create(true).truncate(true);
            }
        }
        opts
    }
}

/// Payload classes.
///
/// Replaces subclassing in ordering and postability decisions: only ASCII
/// content (already wire-encoded) may be posted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentKind {
    /// Raw binary bytes, the result of decoding.
    #[default]
    Binary,
    /// Wire-safe ASCII, the result of encoding.
    Ascii,
}

/// Scope guard for a content's backing file.
///
/// The file is unlinked on drop while `attached` is set; detaching transfers
/// ownership to the caller's filesystem. Split children hold a [`Weak`]
/// handle to their parent's guard so the whole-file checksum stays reachable
/// exactly as long as the parent lives.
#[derive(Debug)]
pub(crate) struct Backing {
    path: RefCell<PathBuf>,
    attached: Cell<bool>,
}

impl Backing {
    fn new(path: PathBuf, attached: bool) -> Rc<Self> {
        Rc::new(Self {
            path: RefCell::new(path),
            attached: Cell::new(attached),
        })
    }

    pub(crate) fn path(&self) -> PathBuf {
        self.path.borrow().clone()
    }

    fn attached(&self) -> bool {
        self.attached.get()
    }

    fn set_attached(&self, attached: bool) {
        self.attached.set(attached);
    }

    fn retarget(&self, path: PathBuf) {
        *self.path.borrow_mut() = path;
    }
}

impl Drop for Backing {
    fn drop(&mut self) {
        if self.attached.get() {
            let path = self.path.borrow();
            match fs::remove_file(&*path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {e}", path.display()),
            }
        }
    }
}

/// Where the payload bytes currently live.
enum Store {
    /// Nothing allocated yet; the first write creates a temp file.
    None,
    /// A file under the work directory or a user-supplied path.
    File {
        backing: Rc<Backing>,
        handle: Option<File>,
    },
    /// A pure in-memory buffer; never touches disk.
    Memory(Cursor<Vec<u8>>),
    /// A directory. Never valid, never opened.
    Dir(PathBuf),
}

/// One payload within an article.
pub struct Content {
    filename: String,
    kind: ContentKind,
    work_dir: PathBuf,
    part: u32,
    total_parts: u32,
    begin: u64,
    end: Option<u64>,
    total_size: Option<u64>,
    sort_no: u32,
    unique_tag: Option<String>,
    valid: bool,
    dirty: bool,
    block_size: usize,
    store: Store,
    mode: Option<FileMode>,
    /// Attach/detach requested before any backing file existed.
    pending_detach: Option<bool>,
    /// Non-owning handle to the parent this was split from.
    parent: Option<Weak<Backing>>,
    /// Whole-file CRC32 carried in a decoded yEnc footer, if any.
    wire_crc32: Option<String>,
}

impl Content {
    /// Create an empty content; the backing temp file is created under
    /// `work_dir` on first write.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            filename: String::new(),
            kind: ContentKind::Binary,
            work_dir: work_dir.as_ref().to_path_buf(),
            part: 1,
            total_parts: 1,
            begin: 0,
            end: None,
            total_size: None,
            sort_no: DEFAULT_SORT_NO,
            unique_tag: None,
            valid: false,
            dirty: false,
            block_size: DEFAULT_BLOCK_SIZE,
            store: Store::None,
            mode: None,
            pending_detach: None,
            parent: None,
            wire_crc32: None,
        }
    }

    /// Create a content backed purely by memory; it never touches disk.
    pub fn memory(work_dir: impl AsRef<Path>) -> Self {
        let mut content = Self::new(work_dir);
        content.store = Store::Memory(Cursor::new(Vec::new()));
        content
    }

    /// Create a content bound to `path`.
    ///
    /// An existing file is loaded in a detached state (see [`Content::load`]);
    /// a missing path only seeds the filename so the payload can be written
    /// later.
    pub fn from_path(path: impl AsRef<Path>, work_dir: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut content = Self::new(work_dir);
        if path.exists() {
            content.load(path)?;
        } else {
            content.filename = basename(path);
        }
        Ok(content)
    }

    /// Set the logical filename.
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = filename.to_string();
        self
    }

    /// Set the payload class.
    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the part layout. `part` is 1-based and must not exceed
    /// `total_parts`.
    pub fn with_part(mut self, part: u32, total_parts: u32) -> Result<Self> {
        if part == 0 || total_parts < part {
            return Err(Error::InvalidPart { part, total_parts });
        }
        self.part = part;
        self.total_parts = total_parts;
        Ok(self)
    }

    /// Set the byte span this part occupies within the whole, half-open
    /// `[begin, end)`.
    pub fn with_span(mut self, begin: u64, end: u64) -> Self {
        self.begin = begin;
        self.end = Some(end);
        self
    }

    pub(crate) fn set_span(&mut self, begin: u64, end: u64) {
        self.begin = begin;
        self.end = Some(end);
    }

    /// Set the byte length of the whole payload this part belongs to.
    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = Some(total_size);
        self
    }

    /// Set the sort tier.
    pub fn with_sort_no(mut self, sort_no: u32) -> Self {
        self.sort_no = sort_no;
        self
    }

    /// Give this content a unique sort-key suffix so otherwise-equal entries
    /// never collapse inside a sorted set.
    pub fn with_unique_tag(mut self) -> Self {
        let tag = UNIQUE_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        self.unique_tag = Some(format!("{tag:08x}"));
        self
    }

    /// The logical filename (no directory component).
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Replace the logical filename.
    pub fn set_filename(&mut self, filename: &str) {
        self.filename = filename.to_string();
    }

    /// The payload class.
    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    /// 1-based part index within the whole.
    pub fn part(&self) -> u32 {
        self.part
    }

    /// Total number of parts composing the whole.
    pub fn total_parts(&self) -> u32 {
        self.total_parts
    }

    /// Update the part index, widening `total_parts` when needed.
    pub fn set_part(&mut self, part: u32) {
        self.part = part.max(1);
        if self.total_parts < self.part {
            self.total_parts = self.part;
        }
    }

    /// Byte offset of this part within the whole.
    pub fn begin(&self) -> u64 {
        self.begin
    }

    /// One past the last byte offset of this part within the whole, computed
    /// from the on-disk length when not explicitly set.
    pub fn end(&mut self) -> Result<u64> {
        if let Some(end) = self.end {
            return Ok(end);
        }
        let end = self.begin + self.length()?;
        self.end = Some(end);
        Ok(end)
    }

    /// Byte length of the whole payload (all parts included). Falls back to
    /// this part's own length when never told otherwise.
    pub fn total_size(&mut self) -> Result<u64> {
        match self.total_size {
            Some(total) => Ok(total),
            None => self.length(),
        }
    }

    /// The sort tier.
    pub fn sort_no(&self) -> u32 {
        self.sort_no
    }

    /// Unique sort-key suffix, if one was assigned.
    pub fn unique_tag(&self) -> Option<&str> {
        self.unique_tag.as_deref()
    }

    /// The work directory temp files are created under.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Maximum chunk size used by streaming operations.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Tune the streaming chunk size.
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size.max(1);
    }

    /// Whether the payload decoded (or loaded) cleanly. Directories are never
    /// valid.
    pub fn is_valid(&self) -> bool {
        self.valid && !self.is_dir()
    }

    pub(crate) fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    /// `true` if the bound path is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self.store, Store::Dir(_))
    }

    /// Only ASCII content is postable as-is; binaries and directories must be
    /// encoded first.
    pub fn can_post(&self) -> bool {
        self.kind == ContentKind::Ascii && !self.is_dir()
    }

    /// Whole-file CRC32 carried in a decoded footer, if the stream supplied
    /// one.
    pub fn wire_crc32(&self) -> Option<&str> {
        self.wire_crc32.as_deref()
    }

    pub(crate) fn set_wire_crc32(&mut self, crc32: Option<String>) {
        self.wire_crc32 = crc32;
    }

    /// The backing path, if a file or directory is bound.
    pub fn filepath(&self) -> Option<PathBuf> {
        match &self.store {
            Store::File { backing, .. } => Some(backing.path()),
            Store::Dir(path) => Some(path.clone()),
            _ => None,
        }
    }

    /// The backing path, creating a temp file first if none exists yet.
    /// In-memory content has no path.
    pub fn path(&mut self) -> Result<PathBuf> {
        if matches!(self.store, Store::None) {
            self.open(FileMode::ReadWrite, false)?;
            self.close()?;
        }
        self.filepath().ok_or(Error::NotOpen)
    }

    /// Whether the backing file is destroyed when this content drops.
    pub fn is_attached(&self) -> bool {
        match self.backing_ref() {
            Some(backing) => backing.attached(),
            None => !self.pending_detach.unwrap_or(false),
        }
    }

    /// Tie the backing file's life to this content.
    pub fn attach(&mut self) {
        match self.backing_ref() {
            Some(backing) => backing.set_attached(true),
            None => self.pending_detach = Some(false),
        }
    }

    /// Release the backing file from management; it will no longer be deleted
    /// on drop.
    pub fn detach(&mut self) {
        match self.backing_ref() {
            Some(backing) => backing.set_attached(false),
            None => self.pending_detach = Some(true),
        }
    }

    /// `true` while the parent this part was split from is still alive.
    pub fn has_parent(&self) -> bool {
        self.parent
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// CRC32 of the whole file this part was split from, while the parent is
    /// still alive. Returns `Ok(None)` once the parent has been dropped.
    pub fn parent_crc32(&self) -> Result<Option<String>> {
        let Some(weak) = &self.parent else {
            return Ok(None);
        };
        let Some(backing) = weak.upgrade() else {
            return Ok(None);
        };
        let file = File::open(backing.path())?;
        crc32_of(file).map(Some)
    }

    /// Open the backing stream.
    ///
    /// Calling with the mode already active only repositions: at the start,
    /// or at the end when `eof` is set. A different mode closes and reopens.
    /// The first open of an unbacked content creates a temp file under the
    /// work directory and attaches it.
    pub fn open(&mut self, mode: FileMode, eof: bool) -> Result<()> {
        match &mut self.store {
            Store::Dir(path) => {
                return Err(Error::IsDirectory { path: path.clone() });
            }
            Store::Memory(cursor) => {
                if self.mode != Some(mode) && mode == FileMode::Truncate {
                    cursor.get_mut().clear();
                }
                self.mode = Some(mode);
                let pos = if eof { cursor.get_ref().len() as u64 } else { 0 };
                cursor.set_position(pos);
                return Ok(());
            }
            Store::File { backing, handle } => {
                if self.mode == Some(mode) {
                    if let Some(file) = handle.as_mut() {
                        if eof {
                            file.seek(SeekFrom::End(0))?;
                        } else {
                            file.seek(SeekFrom::Start(0))?;
                        }
                        return Ok(());
                    }
                }

                // Mode change: drop any previous handle and reopen.
                *handle = None;
                self.dirty = false;
                let path = backing.path();
                let file = match mode.options().open(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        error!("Could not open {} (mode={mode:?}): {e}", path.display());
                        return Err(e.into());
                    }
                };
                debug!("Opened {} (mode={mode:?})", path.display());
                *handle = Some(file);
                self.mode = Some(mode);
                if mode == FileMode::Truncate {
                    self.end = None;
                }
                if eof {
                    self.stream_seek(SeekFrom::End(0))?;
                }
                return Ok(());
            }
            Store::None => {}
        }

        // Nothing allocated yet: create the temp file.
        fs::create_dir_all(&self.work_dir)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.work_dir)?;
        let (file, path) = tmp.keep().map_err(|e| Error::Io(e.error))?;
        debug!("Opened {} (mode={mode:?})", path.display());
        let attached = !self.pending_detach.take().unwrap_or(false);
        self.store = Store::File {
            backing: Backing::new(path, attached),
            handle: Some(file),
        };
        self.mode = Some(mode);
        Ok(())
    }

    /// Close the backing stream, flushing pending writes. Attachment is
    /// unchanged; in-memory buffers are retained.
    pub fn close(&mut self) -> Result<()> {
        match &mut self.store {
            Store::File { backing, handle } => {
                if let Some(mut file) = handle.take() {
                    file.flush()?;
                    debug!("Closed {}", backing.path().display());
                }
            }
            Store::Memory(cursor) => cursor.set_position(0),
            _ => {}
        }
        self.mode = None;
        self.dirty = false;
        Ok(())
    }

    /// Write bytes at the current position, opening read/write at the end of
    /// the stream first if closed. Leaves the content dirty.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.mode.is_none() {
            self.open(FileMode::ReadWrite, true)?;
        }
        self.stream_write_all(data)
            .map_err(|e| Error::from_write(e, self.filepath().unwrap_or_default()))?;
        self.dirty = true;
        // Content changed; any cached end offset is stale now.
        self.end = None;
        Ok(())
    }

    /// Read up to `n` bytes from the current position, opening read-only at
    /// the start first if closed.
    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false)?;
        }
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            let got = self.stream_read(&mut buf[filled..])?;
            if got == 0 {
                break;
            }
            filled += got;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    /// Read everything from the current position to the end of the stream.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false)?;
        }
        let mut out = Vec::new();
        let mut buf = vec![0u8; self.block_size];
        loop {
            let got = self.stream_read(&mut buf)?;
            if got == 0 {
                break;
            }
            out.extend_from_slice(&buf[..got]);
        }
        Ok(out)
    }

    /// Rewind and read the whole payload into memory.
    pub fn getvalue(&mut self) -> Result<Vec<u8>> {
        self.open(FileMode::Read, false)?;
        self.read_all()
    }

    /// Read one line (through the trailing `\n`, when present).
    pub fn readline(&mut self) -> Result<Vec<u8>> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false)?;
        }
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if self.stream_read(&mut byte)? == 0 {
                break;
            }
            out.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(out)
    }

    /// Current stream position, flushing pending writes first so the value
    /// reflects on-disk truth.
    pub fn tell(&mut self) -> Result<u64> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false)?;
        } else if self.dirty {
            self.flush_stream()?;
        }
        Ok(self.stream_seek(SeekFrom::Current(0))?)
    }

    /// Byte length of the payload, flushing pending writes first.
    pub fn length(&mut self) -> Result<u64> {
        match &mut self.store {
            Store::None | Store::Dir(_) => Ok(0),
            Store::Memory(cursor) => Ok(cursor.get_ref().len() as u64),
            Store::File { backing, handle } => {
                if self.dirty {
                    if let Some(file) = handle.as_mut() {
                        file.flush()?;
                    }
                    self.dirty = false;
                }
                Ok(fs::metadata(backing.path())?.len())
            }
        }
    }

    /// `true` when the payload holds no bytes.
    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.length()? == 0)
    }

    /// Rebind this content to `path` in a detached state.
    ///
    /// A previously attached backing file is removed first. Loading a
    /// directory flags the content as such (never valid); a missing path
    /// returns `Ok(false)` and leaves the content unbacked.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        self.close()?;
        self.release_store();
        self.valid = false;
        self.unique_tag = None;

        if path.is_dir() {
            let abs = std::path::absolute(path)?;
            self.filename = basename(&abs);
            self.store = Store::Dir(abs);
            // The flag is set, but is_valid() still reports false for
            // directories.
            self.valid = true;
            return Ok(true);
        }

        if !path.is_file() {
            self.filename.clear();
            return Ok(false);
        }

        let abs = std::path::absolute(path)?;
        self.filename = basename(&abs);
        self.store = Store::File {
            backing: Backing::new(abs, false),
            handle: None,
        };
        self.valid = true;
        Ok(true)
    }

    /// Rebind this content to the concatenation of `sources`, in order, as a
    /// fresh attached file. Returns `Ok(false)` when no sources were given.
    ///
    /// A single source behaves as a copy and preserves its part index.
    pub fn load_parts<'a, I>(&mut self, sources: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a mut Content>,
    {
        self.close()?;
        self.release_store();
        self.valid = false;
        self.unique_tag = None;

        let mut count = 0u32;
        let mut first_part = 1;
        for source in sources {
            if count == 0 {
                first_part = source.part;
            }
            self.append(source)?;
            count += 1;
        }

        if count == 0 {
            self.filename.clear();
            return Ok(false);
        }
        if count == 1 {
            self.part = first_part;
        }

        self.close()?;
        if let Some(path) = self.filepath() {
            self.filename = basename(&path);
        }
        self.valid = true;
        Ok(true)
    }

    /// Rebind this content to an attached copy of `other`, preserving its
    /// part index.
    pub fn load_content(&mut self, other: &mut Content) -> Result<bool> {
        self.load_parts(std::iter::once(other))
    }

    /// Copy `other`'s bytes onto the end of this content, streaming in
    /// block-sized reads. Leaves this content dirty.
    pub fn append(&mut self, other: &mut Content) -> Result<()> {
        self.open(FileMode::ReadWrite, true)?;
        other.open(FileMode::Read, false)?;
        debug!("Appending content {other}");

        let mut buf = vec![0u8; self.block_size];
        loop {
            let got = other.stream_read(&mut buf)?;
            if got == 0 {
                break;
            }
            self.stream_write_all(&buf[..got])
                .map_err(|e| Error::from_write(e, self.filepath().unwrap_or_default()))?;
        }

        self.dirty = true;
        self.end = None;
        other.close()?;
        Ok(())
    }

    /// Split this payload into attached children of `part_size` bytes each
    /// (the last child holds the remainder), reading `mem_buf` bytes at a
    /// time.
    ///
    /// Children carry their span within the whole, the whole's size, an
    /// inherited sort tier and a non-owning handle back to this content for
    /// whole-file checksums. On any IO failure no partial result is returned
    /// and already-written child files are discarded.
    pub fn split(&mut self, part_size: u64, mem_buf: usize) -> Result<Vec<Content>> {
        if part_size == 0 {
            return Err(Error::InvalidSize {
                field: "part_size",
                value: 0,
            });
        }
        if mem_buf == 0 {
            return Err(Error::InvalidSize {
                field: "mem_buf",
                value: 0,
            });
        }
        let file_size = self.length()?;
        if file_size == 0 {
            return Err(Error::EmptyContent);
        }

        self.open(FileMode::Read, false)?;
        let result = self.split_inner(part_size, mem_buf, file_size);
        let _ = self.close();
        if let Err(e) = &result {
            error!("Split of {self} failed: {e}");
        }
        result
    }

    fn split_inner(&mut self, part_size: u64, mem_buf: usize, file_size: u64) -> Result<Vec<Content>> {
        let total_parts = file_size.div_ceil(part_size) as u32;
        let parent = self.backing_ref().map(Rc::downgrade);
        let mut children = Vec::with_capacity(total_parts as usize);
        let mut buf = vec![0u8; mem_buf];

        for part in 1..=total_parts {
            let begin = u64::from(part - 1) * part_size;
            let end = file_size.min(begin + part_size);

            let mut child = Content::new(&self.work_dir)
                .with_kind(self.kind)
                .with_filename(&self.filename)
                .with_sort_no(self.sort_no)
                .with_part(part, total_parts)?
                .with_span(begin, end)
                .with_total_size(file_size);
            child.parent.clone_from(&parent);
            child.open(FileMode::Truncate, false)?;

            let mut remaining = end - begin;
            while remaining > 0 {
                let want = remaining.min(buf.len() as u64) as usize;
                let got = self.stream_read(&mut buf[..want])?;
                if got == 0 {
                    return Err(Error::Io(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "backing file shrank during split",
                    )));
                }
                child.write(&buf[..got])?;
                remaining -= got as u64;
            }
            child.close()?;
            children.push(child);
        }

        Ok(children)
    }

    /// Duplicate this payload into a fresh attached temp file, preserving
    /// filename, part layout, span and sort tier.
    pub fn copy(&mut self) -> Result<Content> {
        let mut dup = Content::new(&self.work_dir)
            .with_kind(self.kind)
            .with_filename(&self.filename)
            .with_sort_no(self.sort_no)
            .with_part(self.part, self.total_parts)?;
        dup.begin = self.begin;
        dup.end = self.end;
        dup.total_size = self.total_size;

        self.open(FileMode::Read, false)?;
        dup.open(FileMode::Truncate, false)?;
        let mut buf = vec![0u8; self.block_size];
        loop {
            let got = self.stream_read(&mut buf)?;
            if got == 0 {
                break;
            }
            dup.write(&buf[..got])?;
        }
        dup.close()?;
        self.close()?;

        dup.valid = self.valid;
        Ok(dup)
    }

    /// Move (default) or copy the backing file to `target`.
    ///
    /// A move promotes this content to detached and retargets its path, so
    /// the saved artifact survives the content's drop. An existing target is
    /// removed first; missing parent directories are created.
    pub fn save(&mut self, target: impl AsRef<Path>, copy: bool) -> Result<()> {
        if let Store::Dir(path) = &self.store {
            return Err(Error::IsDirectory { path: path.clone() });
        }

        let current = self.path()?;
        let mut target = target.as_ref().to_path_buf();
        if target.is_dir() {
            let name = if self.filename.is_empty() {
                basename(&current)
            } else {
                self.filename.clone()
            };
            target = target.join(name);
        }
        let target = std::path::absolute(&target)?;

        if target == current {
            if !copy {
                self.detach();
            }
            return Ok(());
        }

        if target.exists() {
            fs::remove_file(&target)?;
            warn!("{} already existed (removed).", target.display());
        }
        if let Some(dir) = target.parent() {
            if !dir.as_os_str().is_empty() && !dir.is_dir() {
                fs::create_dir_all(dir)?;
            }
        }

        self.close()?;
        if copy {
            fs::copy(&current, &target)?;
            debug!("copy({}, {})", current.display(), target.display());
        } else {
            match fs::rename(&current, &target) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                    fs::copy(&current, &target)?;
                    fs::remove_file(&current)?;
                }
                Err(e) => return Err(e.into()),
            }
            debug!("move({}, {})", current.display(), target.display());

            // Promote in place so split children keep a working handle.
            if let Some(backing) = self.backing_ref() {
                backing.retarget(target.clone());
                backing.set_attached(false);
            }
            self.filename = basename(&target);
        }
        Ok(())
    }

    /// Delete the backing file (attached or not). Returns `true` if a file
    /// was removed.
    pub fn remove(&mut self) -> Result<bool> {
        self.close()?;
        let Some(backing) = self.backing_ref() else {
            return Ok(false);
        };
        match fs::remove_file(backing.path()) {
            Ok(()) => {
                backing.set_attached(false);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// MD5 of the payload as lowercase hex.
    pub fn md5(&mut self) -> Result<String> {
        self.hash_stream::<Md5>()
    }

    /// SHA-1 of the payload as lowercase hex.
    pub fn sha1(&mut self) -> Result<String> {
        self.hash_stream::<Sha1>()
    }

    /// SHA-256 of the payload as lowercase hex.
    pub fn sha256(&mut self) -> Result<String> {
        self.hash_stream::<Sha256>()
    }

    fn hash_stream<D: Digest>(&mut self) -> Result<String> {
        self.open(FileMode::Read, false)?;
        let mut hasher = D::new();
        let mut buf = vec![0u8; self.block_size];
        loop {
            let got = self.stream_read(&mut buf)?;
            if got == 0 {
                break;
            }
            hasher.update(&buf[..got]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// CRC32 of the payload as 8 lowercase hex digits, the form yEnc footers
    /// carry.
    pub fn crc32(&mut self) -> Result<String> {
        self.open(FileMode::Read, false)?;
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = vec![0u8; 65536];
        loop {
            let got = self.stream_read(&mut buf)?;
            if got == 0 {
                break;
            }
            hasher.update(&buf[..got]);
        }
        Ok(format!("{:08x}", hasher.finalize()))
    }

    /// Best-effort MIME type: magic-number sniffing over the first bytes,
    /// falling back to the filename extension.
    pub fn mime(&mut self) -> Option<String> {
        if !self.is_dir() && self.open(FileMode::Read, false).is_ok() {
            let head = self.read(128).unwrap_or_default();
            let _ = self.close();
            if let Some(kind) = infer::get(&head) {
                return Some(kind.mime_type().to_string());
            }
        }

        let name = if self.filename.is_empty() {
            self.filepath()?.to_string_lossy().into_owned()
        } else {
            self.filename.clone()
        };
        mime_guess::from_path(Path::new(&name))
            .first()
            .map(|m| m.to_string())
    }

    /// Hex dump of the payload head, up to `max_bytes` (0 dumps everything).
    pub fn hexdump(&mut self, max_bytes: usize) -> Result<String> {
        self.open(FileMode::Read, false)?;
        let data = if max_bytes == 0 {
            self.read_all()?
        } else {
            self.read(max_bytes)?
        };
        Ok(util::hexdump(&data))
    }

    /// Iterate the payload in blocks of at most `block_size` bytes for wire
    /// transmission (0 uses the content's configured block size). Nothing is
    /// buffered beyond one block.
    pub fn post_iter(&mut self, block_size: usize) -> PostIter<'_> {
        let block = if block_size == 0 {
            self.block_size
        } else {
            block_size
        };
        PostIter {
            content: self,
            block,
            started: false,
            done: false,
        }
    }

    /// Deterministic sort key: tier, then filename, then part, then the
    /// unique tag.
    pub fn sort_key(&self) -> String {
        let mut key = format!("{:05}/{}/{:05}", self.sort_no, self.filename, self.part);
        if let Some(tag) = &self.unique_tag {
            key.push_str(tag);
        }
        key
    }

    fn backing_ref(&self) -> Option<&Rc<Backing>> {
        match &self.store {
            Store::File { backing, .. } => Some(backing),
            _ => None,
        }
    }

    fn release_store(&mut self) {
        self.store = Store::None;
        self.mode = None;
        self.dirty = false;
    }

    fn flush_stream(&mut self) -> Result<()> {
        if let Store::File {
            handle: Some(file), ..
        } = &mut self.store
        {
            file.flush()?;
        }
        self.dirty = false;
        Ok(())
    }

    fn stream_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let open = self.mode.is_some();
        match &mut self.store {
            Store::File {
                handle: Some(file), ..
            } => file.read(buf),
            Store::Memory(cursor) if open => cursor.read(buf),
            _ => Err(not_open()),
        }
    }

    fn stream_write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let open = self.mode.is_some();
        match &mut self.store {
            Store::File {
                handle: Some(file), ..
            } => file.write_all(buf),
            Store::Memory(cursor) if open => cursor.write_all(buf),
            _ => Err(not_open()),
        }
    }

    fn stream_seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let open = self.mode.is_some();
        match &mut self.store {
            Store::File {
                handle: Some(file), ..
            } => file.seek(pos),
            Store::Memory(cursor) if open => cursor.seek(pos),
            _ => Err(not_open()),
        }
    }
}

fn not_open() -> io::Error {
    io::Error::new(ErrorKind::NotConnected, "content stream is not open")
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Stream a reader through CRC32, returning 8 lowercase hex digits.
pub(crate) fn crc32_of<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = vec![0u8; 65536];
    loop {
        let got = reader.read(&mut buf)?;
        if got == 0 {
            break;
        }
        hasher.update(&buf[..got]);
    }
    Ok(format!("{:08x}", hasher.finalize()))
}

impl io::Read for Content {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false).map_err(io::Error::other)?;
        }
        self.stream_read(buf)
    }
}

impl io::Write for Content {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.mode.is_none() {
            self.open(FileMode::ReadWrite, true)
                .map_err(io::Error::other)?;
        }
        self.stream_write_all(buf)?;
        self.dirty = true;
        self.end = None;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_stream().map_err(io::Error::other)
    }
}

impl io::Seek for Content {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if self.mode.is_none() {
            self.open(FileMode::Read, false).map_err(io::Error::other)?;
        }
        self.stream_seek(pos)
    }
}

impl PartialEq for Content {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Content {}

impl PartialOrd for Content {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Content {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:05}", self.filename, self.part)
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Content sort={} filename={:?} part={}/{} attached={} />",
            self.sort_no,
            self.filename,
            self.part,
            self.total_parts,
            self.is_attached(),
        )
    }
}

/// Block iterator over a content's payload; see [`Content::post_iter`].
pub struct PostIter<'a> {
    content: &'a mut Content,
    block: usize,
    started: bool,
    done: bool,
}

impl Iterator for PostIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            if let Err(e) = self.content.open(FileMode::Read, false) {
                self.done = true;
                return Some(Err(e));
            }
            self.started = true;
        }

        let mut buf = vec![0u8; self.block];
        match self.content.stream_read(&mut buf) {
            Ok(0) => {
                let _ = self.content.close();
                self.done = true;
                None
            }
            Ok(got) => {
                buf.truncate(got);
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::RngExt;
    use tempfile::tempdir;

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        rand::rng().fill(&mut data);
        data
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path()).with_filename("hello.bin");

        content.write(b"hello world").unwrap();
        assert_eq!(content.length().unwrap(), 11);
        assert!(!content.is_empty().unwrap());

        assert_eq!(content.getvalue().unwrap(), b"hello world");
        assert_eq!(content.read(5).unwrap(), Vec::<u8>::new());

        content.open(FileMode::Read, false).unwrap();
        assert_eq!(content.read(5).unwrap(), b"hello");
        assert_eq!(content.tell().unwrap(), 5);
    }

    #[test]
    fn test_attached_cleanup_on_drop() {
        let dir = tempdir().unwrap();
        let path = {
            let mut content = Content::new(dir.path());
            content.write(b"scratch").unwrap();
            content.close().unwrap();
            assert!(content.is_attached());
            content.path().unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_detached_survives_drop() {
        let dir = tempdir().unwrap();
        let path = {
            let mut content = Content::new(dir.path());
            content.write(b"keeper").unwrap();
            content.close().unwrap();
            content.detach();
            assert!(!content.is_attached());
            content.path().unwrap()
        };
        assert!(path.exists());
    }

    #[test]
    fn test_load_existing_is_detached_and_valid() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("source.dat");
        fs::write(&file, b"0123456789").unwrap();

        let mut content = Content::new(dir.path());
        assert!(content.load(&file).unwrap());
        assert!(content.is_valid());
        assert!(!content.is_attached());
        assert_eq!(content.filename(), "source.dat");
        assert_eq!(content.length().unwrap(), 10);
    }

    #[test]
    fn test_load_missing_resets_state() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path()).with_filename("old");
        assert!(!content.load(dir.path().join("no.such.file")).unwrap());
        assert_eq!(content.filename(), "");
        assert!(content.filepath().is_none());
        assert!(!content.is_valid());
    }

    #[test]
    fn test_load_directory_never_valid() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path());
        assert!(content.load(dir.path()).unwrap());
        assert!(content.is_dir());
        assert!(!content.is_valid());
        assert!(content.open(FileMode::Read, false).is_err());
    }

    #[test]
    fn test_split_layout_and_reassembly() {
        let dir = tempdir().unwrap();
        let data = random_bytes(100_000);
        let mut content = Content::new(dir.path()).with_filename("blob.bin");
        content.write(&data).unwrap();
        content.close().unwrap();
        let source_md5 = content.md5().unwrap();

        let mut parts = content.split(30_000, 8_192).unwrap();
        assert_eq!(parts.len(), 4);
        for (i, part) in parts.iter_mut().enumerate() {
            let i = i as u64;
            assert_eq!(part.part(), i as u32 + 1);
            assert_eq!(part.total_parts(), 4);
            assert_eq!(part.begin(), i * 30_000);
            assert_eq!(part.end().unwrap(), 100_000.min((i + 1) * 30_000));
            assert_eq!(part.total_size().unwrap(), 100_000);
            assert!(part.is_attached());
            assert!(part.has_parent());
        }
        assert_eq!(parts[3].length().unwrap(), 10_000);

        let mut joined = Content::new(dir.path());
        assert!(joined.load_parts(parts.iter_mut()).unwrap());
        assert_eq!(joined.md5().unwrap(), source_md5);
        assert!(joined.is_attached());
    }

    #[test]
    fn test_split_single_part_when_size_covers_all() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path()).with_filename("small.bin");
        content.write(b"0123456789").unwrap();

        let mut parts = content.split(10, 1024).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].getvalue().unwrap(), b"0123456789");

        let mut parts = content.split(1024, 1024).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].end().unwrap(), 10);
    }

    #[test]
    fn test_split_rejects_bad_arguments() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path());
        content.write(b"x").unwrap();

        assert!(matches!(
            content.split(0, 1024),
            Err(Error::InvalidSize { field: "part_size", .. })
        ));
        assert!(matches!(
            content.split(1024, 0),
            Err(Error::InvalidSize { field: "mem_buf", .. })
        ));

        let mut empty = Content::new(dir.path());
        empty.write(b"").unwrap();
        assert!(matches!(empty.split(1024, 1024), Err(Error::EmptyContent)));
    }

    #[test]
    fn test_parent_handle_severed_on_drop() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path()).with_filename("p.bin");
        content.write(&random_bytes(1000)).unwrap();
        let expected = content.crc32().unwrap();

        let mut parts = content.split(600, 256).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].parent_crc32().unwrap(), Some(expected));

        drop(content);
        assert!(!parts[0].has_parent());
        assert_eq!(parts[0].parent_crc32().unwrap(), None);
    }

    #[test]
    fn test_copy_duplicates_bytes_on_new_path() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path()).with_filename("orig.bin");
        content.write(&random_bytes(5000)).unwrap();
        content.close().unwrap();

        let mut dup = content.copy().unwrap();
        assert_eq!(dup.md5().unwrap(), content.md5().unwrap());
        assert_ne!(dup.path().unwrap(), content.path().unwrap());
        assert_eq!(dup.filename(), "orig.bin");
        assert!(dup.is_attached());
    }

    #[test]
    fn test_save_move_promotes_to_detached() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("saved").join("final.bin");

        let mut content = Content::new(dir.path()).with_filename("final.bin");
        content.write(b"payload").unwrap();
        let old_path = content.path().unwrap();

        content.save(&target, false).unwrap();
        assert!(!old_path.exists());
        assert!(target.exists());
        assert!(!content.is_attached());
        assert_eq!(content.path().unwrap(), target);

        drop(content);
        assert!(target.exists());
    }

    #[test]
    fn test_save_copy_keeps_original_attached() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("copy.bin");

        let mut content = Content::new(dir.path());
        content.write(b"payload").unwrap();
        let old_path = content.path().unwrap();

        content.save(&target, true).unwrap();
        assert!(old_path.exists());
        assert!(target.exists());
        assert!(content.is_attached());
        assert_eq!(content.path().unwrap(), old_path);
    }

    #[test]
    fn test_sort_key_ordering() {
        let dir = tempdir().unwrap();
        let a = Content::new(dir.path()).with_filename("a").with_sort_no(100);
        let b = Content::new(dir.path()).with_filename("a");
        let c = Content::new(dir.path())
            .with_filename("a")
            .with_part(2, 2)
            .unwrap();

        assert!(a < b);
        assert!(b < c);
        assert_eq!(b, Content::new(dir.path()).with_filename("a"));

        // unique tags keep otherwise-equal entries distinct
        let t1 = Content::new(dir.path()).with_filename("a").with_unique_tag();
        let t2 = Content::new(dir.path()).with_filename("a").with_unique_tag();
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_memory_content() {
        let dir = tempdir().unwrap();
        let mut content = Content::memory(dir.path());
        content.write(b"in memory").unwrap();
        assert_eq!(content.length().unwrap(), 9);
        assert_eq!(content.getvalue().unwrap(), b"in memory");
        assert!(content.filepath().is_none());
        assert_eq!(content.crc32().unwrap().len(), 8);
    }

    #[test]
    fn test_post_iter_blocks() {
        let dir = tempdir().unwrap();
        let data = random_bytes(10_000);
        let mut content = Content::new(dir.path());
        content.write(&data).unwrap();

        let blocks: Vec<Vec<u8>> = content.post_iter(4096).map(|b| b.unwrap()).collect();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks.concat(), data);
    }

    #[test]
    fn test_crc32_known_value() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path());
        content.write(b"").unwrap();
        assert_eq!(content.crc32().unwrap(), "00000000");

        let mut content = Content::new(dir.path());
        content.write(b"123456789").unwrap();
        // standard CRC-32 check value
        assert_eq!(content.crc32().unwrap(), "cbf43926");
    }

    #[test]
    fn test_reopen_same_mode_repositions() {
        let dir = tempdir().unwrap();
        let mut content = Content::new(dir.path());
        content.write(b"abcdef").unwrap();

        content.open(FileMode::Read, false).unwrap();
        assert_eq!(content.read(3).unwrap(), b"abc");
        content.open(FileMode::Read, false).unwrap();
        assert_eq!(content.tell().unwrap(), 0);
        content.open(FileMode::Read, true).unwrap();
        assert_eq!(content.tell().unwrap(), 6);
    }
}
