//! Multi-part post assembly
//!
//! A [`SegmentedPost`] groups the articles that together reconstruct one
//! logical file. Articles stay ordered by their sort key, so parts decoded
//! out of arrival order still reassemble deterministically.

use std::fmt;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::warn;

use crate::article::Article;
use crate::content::Content;
use crate::error::{Error, Result};

/// An ordered group of articles reconstructing one file.
pub struct SegmentedPost {
    filename: String,
    work_dir: PathBuf,
    articles: Vec<Article>,
}

impl SegmentedPost {
    /// Create an empty post for `filename`.
    pub fn new(filename: &str, work_dir: impl AsRef<Path>) -> Self {
        Self {
            filename: filename.to_string(),
            work_dir: work_dir.as_ref().to_path_buf(),
            articles: Vec::new(),
        }
    }

    /// The logical filename this post reconstructs.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Insert an article, keeping sort-key order. Duplicate keys are ignored
    /// and return `false`.
    pub fn add(&mut self, article: Article) -> bool {
        let key = article.sort_key();
        match self
            .articles
            .binary_search_by(|existing| existing.sort_key().cmp(&key))
        {
            Ok(_) => false,
            Err(idx) => {
                self.articles.insert(idx, article);
                true
            }
        }
    }

    /// Articles in sort-key order.
    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }

    /// Mutable view of the articles, still in order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Article> {
        self.articles.iter_mut()
    }

    /// Number of part articles present.
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// `true` when no parts have arrived yet.
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Total byte size across all part contents.
    pub fn size(&mut self) -> Result<u64> {
        let mut total = 0;
        for article in &mut self.articles {
            total += article.size()?;
        }
        Ok(total)
    }

    /// A post is valid when every part is present, in sequence, and decoded
    /// cleanly: part `i` carries a valid content with `part == i` and a
    /// `total_parts` matching the number of articles held.
    pub fn is_valid(&self) -> bool {
        if self.articles.is_empty() {
            return false;
        }
        let total = self.articles.len() as u32;
        self.articles.iter().enumerate().all(|(i, article)| {
            article.first_content().is_some_and(|content| {
                content.is_valid()
                    && content.part() == i as u32 + 1
                    && content.total_parts() == total
            })
        })
    }

    /// Derived post identifier: md5 of the first article's Message-ID, used
    /// by external indexers for deduplication. `None` until the first
    /// article carries an id.
    pub fn gid(&self) -> Option<String> {
        let message_id = self.articles.first()?.message_id();
        if message_id.is_empty() {
            return None;
        }
        let mut hasher = Md5::new();
        hasher.update(message_id.as_bytes());
        Some(hex::encode(hasher.finalize()))
    }

    /// Concatenate every part's content, in order, into one fresh attached
    /// content carrying the post's filename.
    ///
    /// When any part supplied a whole-file CRC32 in its footer, the joined
    /// payload is verified against it; a mismatch leaves the result marked
    /// invalid rather than failing.
    pub fn join(&mut self) -> Result<Content> {
        let expected_crc32 = self
            .articles
            .iter()
            .find_map(|article| article.first_content()?.wire_crc32().map(str::to_string));

        let mut target = Content::new(&self.work_dir);
        let loaded = target.load_parts(
            self.articles
                .iter_mut()
                .filter_map(Article::first_content_mut),
        )?;
        if !loaded {
            return Err(Error::EmptyContent);
        }
        target.set_filename(&self.filename);

        if let Some(expected) = expected_crc32 {
            let actual = target.crc32()?;
            if !expected.eq_ignore_ascii_case(&actual) {
                warn!(
                    "Whole-file CRC mismatch for {}: expected {expected}, got {actual}",
                    self.filename,
                );
                target.set_valid(false);
            }
        }
        Ok(target)
    }
}

impl fmt::Debug for SegmentedPost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<SegmentedPost filename={:?} parts={} />",
            self.filename,
            self.articles.len(),
        )
    }
}
