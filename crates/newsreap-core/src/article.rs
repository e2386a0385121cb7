//! One Usenet article
//!
//! An [`Article`] binds the posting metadata (subject, poster, groups,
//! Message-ID) to the content retrieved from or destined for the wire. Like
//! [`Content`], articles lean on attached temp files, so dropping an article
//! cleans up everything it still owns.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::content::{Content, PostIter};
use crate::error::{Error, Result};
use crate::group::Group;
use crate::header::Header;
use crate::response::{Response, ResponseItem};
use crate::yenc::{CodecYenc, parse_subject};

/// Subject used when none was supplied.
pub const DEFAULT_SUBJECT: &str = "unknown.file";

/// Poster used when none was supplied.
pub const DEFAULT_POSTER: &str = "newsreaper <news@reap.er>";

/// Article number used before a group assigns a real one.
pub const DEFAULT_ARTICLE_NO: u32 = 1000;

const MSGID_DOMAIN: &str = "newsreap";

/// One article: posting metadata plus an ordered set of content.
pub struct Article {
    /// Subject line.
    pub subject: String,
    /// Poster identity, `name <addr>` form.
    pub poster: String,
    /// Article number within a group.
    pub no: u32,
    /// Non-decoded textual body.
    pub body: String,
    message_id: String,
    groups: BTreeSet<Group>,
    header: Option<Header>,
    decoded: Vec<Content>,
    work_dir: PathBuf,
}

impl Article {
    /// Create an article whose content scratch files land under `work_dir`.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
            poster: DEFAULT_POSTER.to_string(),
            no: DEFAULT_ARTICLE_NO,
            body: String::new(),
            message_id: String::new(),
            groups: BTreeSet::new(),
            header: None,
            decoded: Vec::new(),
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Set the subject line.
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    /// Set the poster identity.
    pub fn with_poster(mut self, poster: &str) -> Self {
        self.poster = poster.to_string();
        self
    }

    /// Set the Message-ID.
    pub fn with_message_id(mut self, message_id: &str) -> Self {
        self.message_id = message_id.to_string();
        self
    }

    /// Set the groups from a string naming one or more of them; names are
    /// normalized and duplicates collapse.
    pub fn with_groups(mut self, groups: &str) -> Self {
        self.groups = Group::split(groups);
        self
    }

    /// Set the article number.
    pub fn with_no(mut self, no: u32) -> Self {
        self.no = no;
        self
    }

    /// The current Message-ID (possibly empty).
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// The Message-ID, generating a fresh one first if absent or when
    /// `reset` is set.
    pub fn msgid(&mut self, reset: bool) -> &str {
        if reset || self.message_id.is_empty() {
            self.message_id = format!("<{}@{MSGID_DOMAIN}>", Uuid::new_v4().as_simple());
        }
        &self.message_id
    }

    /// The normalized group set.
    pub fn groups(&self) -> &BTreeSet<Group> {
        &self.groups
    }

    /// Add one group by raw name. Returns `false` when the normalized name
    /// was already present.
    pub fn add_group(&mut self, name: &str) -> Result<bool> {
        Ok(self.groups.insert(Group::new(name)?))
    }

    /// The embedded header block, when one was loaded.
    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    /// Mutable access to the header block, creating an empty one on demand.
    pub fn header_mut(&mut self) -> &mut Header {
        self.header.get_or_insert_with(Header::new)
    }

    /// The work directory handed to content this article creates.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Adopt a fetched response: its body, its decoded content set, and the
    /// embedded header if one was found.
    pub fn load_response(&mut self, mut response: Response) -> bool {
        let body = std::mem::take(&mut response.body);
        self.decoded.clear();
        self.header = None;
        for item in response.into_decoded() {
            match item {
                ResponseItem::Header(header) => self.header = Some(header),
                ResponseItem::Content(content) => {
                    self.add(content);
                }
            }
        }
        self.body = body;
        true
    }

    /// Overlay another article on this one, overwriting only the fields the
    /// donor actually supplies (non-empty strings and sets; the article
    /// number always follows the donor).
    pub fn load_article(&mut self, other: Article) -> bool {
        self.no = other.no;
        if !other.subject.is_empty() {
            self.subject = other.subject;
        }
        if !other.poster.is_empty() {
            self.poster = other.poster;
        }
        if !other.message_id.is_empty() {
            self.message_id = other.message_id;
        }
        if !other.groups.is_empty() {
            self.groups = other.groups;
        }
        if other.header.is_some() {
            self.header = other.header;
        }
        if !other.body.is_empty() {
            self.body = other.body;
        }
        if !other.decoded.is_empty() {
            self.decoded = other.decoded;
        }
        true
    }

    /// Insert content into the decoded set, keeping sort-key order.
    /// Duplicate sort keys are ignored and return `false`.
    pub fn add(&mut self, content: Content) -> bool {
        let key = content.sort_key();
        match self
            .decoded
            .binary_search_by(|existing| existing.sort_key().cmp(&key))
        {
            Ok(_) => false,
            Err(idx) => {
                self.decoded.insert(idx, content);
                true
            }
        }
    }

    /// Load a file from disk and insert it as content.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let content = Content::from_path(path, &self.work_dir)?;
        Ok(self.add(content))
    }

    /// Contents in sort-key order.
    pub fn contents(&self) -> impl Iterator<Item = &Content> {
        self.decoded.iter()
    }

    /// Mutable view of the contents, still in sort-key order.
    pub fn contents_mut(&mut self) -> impl Iterator<Item = &mut Content> {
        self.decoded.iter_mut()
    }

    /// Content at `idx`, in sort-key order.
    pub fn get(&self, idx: usize) -> Option<&Content> {
        self.decoded.get(idx)
    }

    /// First content in sort order.
    pub fn first_content(&self) -> Option<&Content> {
        self.decoded.first()
    }

    /// Mutable first content in sort order.
    pub fn first_content_mut(&mut self) -> Option<&mut Content> {
        self.decoded.first_mut()
    }

    /// Number of content entries.
    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    /// `true` when no content is attached.
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }

    /// Backing paths of every content entry.
    pub fn files(&mut self) -> Result<Vec<PathBuf>> {
        self.decoded.iter_mut().map(Content::path).collect()
    }

    /// Total byte size of the decoded content.
    pub fn size(&mut self) -> Result<u64> {
        let mut total = 0;
        for content in &mut self.decoded {
            total += content.length()?;
        }
        Ok(total)
    }

    /// An article is valid once it holds content and every piece decoded
    /// cleanly.
    pub fn is_valid(&self) -> bool {
        !self.decoded.is_empty() && self.decoded.iter().all(Content::is_valid)
    }

    /// Release every content file from scope management.
    pub fn detach(&mut self) {
        for content in &mut self.decoded {
            content.detach();
        }
    }

    /// Split this article's single content into per-part articles sharing
    /// subject, poster and groups. Each child article numbers itself by its
    /// part index so the set orders naturally.
    pub fn split(&mut self, size: u64, mem_buf: usize) -> Result<Vec<Article>> {
        let Some(content) = self.decoded.first_mut() else {
            return Err(Error::EmptyContent);
        };
        let parts = content.split(size, mem_buf)?;

        let mut articles = Vec::with_capacity(parts.len());
        for part in parts {
            let mut article = Article::new(&self.work_dir)
                .with_subject(&self.subject)
                .with_poster(&self.poster)
                .with_no(part.part());
            article.groups = self.groups.clone();
            article.header = self.header.clone();
            article.add(part);
            articles.push(article);
        }
        Ok(articles)
    }

    /// Concatenate another article's payload onto the end of this one,
    /// creating the receiving content if this article is still empty.
    pub fn append(&mut self, other: &mut Article) -> Result<()> {
        if self.decoded.is_empty() {
            let filename = other
                .first_content()
                .map(|c| c.filename().to_string())
                .unwrap_or_default();
            let content = Content::new(&self.work_dir).with_filename(&filename);
            self.decoded.push(content);
        }

        // appending lands in the first (and usually only) content
        let Some(target) = self.decoded.first_mut() else {
            return Err(Error::EmptyContent);
        };
        for content in &mut other.decoded {
            target.append(content)?;
        }
        Ok(())
    }

    /// Deep-copy this article: header cloned, every content duplicated into
    /// its own fresh temp file.
    pub fn copy(&mut self) -> Result<Article> {
        let mut dup = Article::new(&self.work_dir)
            .with_subject(&self.subject)
            .with_poster(&self.poster)
            .with_message_id(&self.message_id)
            .with_no(self.no);
        dup.groups = self.groups.clone();
        dup.header = self.header.clone();
        dup.body = self.body.clone();
        for content in &mut self.decoded {
            dup.decoded.push(content.copy()?);
        }
        Ok(dup)
    }

    /// Wire form for posting, or `None` when the posting preconditions
    /// (subject, poster, at least one group) are not met.
    pub fn post_iter(&mut self) -> Option<ArticlePostIter<'_>> {
        if self.subject.is_empty() || self.poster.is_empty() || self.groups.is_empty() {
            debug!("Article {self} is not postable");
            return None;
        }

        let head = self.render_head();
        Some(ArticlePostIter {
            head: Some(head.into_bytes()),
            contents: self.decoded.iter_mut(),
            current: None,
        })
    }

    fn render_head(&mut self) -> String {
        let message_id = self.msgid(false).to_string();
        let groups = self
            .groups
            .iter()
            .map(Group::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut head = String::new();
        head.push_str(&format!("Subject: {}\r\n", self.subject));
        head.push_str(&format!("From: {}\r\n", self.poster));
        head.push_str(&format!("Newsgroups: {groups}\r\n"));
        head.push_str(&format!("Message-ID: {message_id}\r\n"));
        if let Some(header) = &self.header {
            for (name, value) in header.iter() {
                if matches!(
                    name.to_ascii_lowercase().as_str(),
                    "subject" | "from" | "newsgroups" | "message-id"
                ) {
                    continue;
                }
                head.push_str(&format!("{name}: {value}\r\n"));
            }
        }
        head.push_str("\r\n");
        if !self.body.is_empty() {
            head.push_str(&self.body);
            head.push_str("\r\n");
        }
        head
    }

    /// Best-guess filename for an obfuscated post.
    ///
    /// Precedence: the attachment's own name when it is unambiguous and its
    /// extension means something; a name parsed from the subject otherwise;
    /// and when `filebase` is supplied, it replaces the stem of whichever
    /// name won. Two or more attachments are ambiguous and yield `None`.
    /// Passing an empty codec list disables subject parsing.
    pub fn deobfuscate(
        &self,
        filebase: Option<&str>,
        codecs: Option<&[CodecYenc]>,
    ) -> Option<String> {
        let attachment = match self.decoded.len() {
            0 => None,
            1 => {
                let name = self.decoded[0].filename();
                (!name.is_empty()).then(|| name.to_string())
            }
            _ => return None,
        };

        let subject_name = match codecs {
            Some([]) => None,
            Some(list) => list
                .iter()
                .find_map(|codec| codec.parse_article(&self.subject).and_then(|p| p.fname)),
            None => parse_subject(&self.subject).and_then(|p| p.fname),
        };

        let winner = match (&attachment, &subject_name) {
            (Some(name), Some(parsed)) => {
                // the attachment wins unless its extension is meaningless
                if known_extension(name) || !known_extension(parsed) {
                    name.clone()
                } else {
                    parsed.clone()
                }
            }
            (Some(name), None) => name.clone(),
            (None, Some(parsed)) => parsed.clone(),
            (None, None) => return None,
        };

        match filebase {
            Some(base) if !base.is_empty() => match Path::new(&winner).extension() {
                Some(ext) => Some(format!("{base}.{}", ext.to_string_lossy())),
                None => Some(base.to_string()),
            },
            _ => Some(winner),
        }
    }

    /// Sort key: article number, then Message-ID.
    pub fn sort_key(&self) -> String {
        format!("{:05}{}", self.no, self.message_id)
    }
}

fn known_extension(name: &str) -> bool {
    mime_guess::from_path(Path::new(name)).first().is_some()
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Article {}

impl PartialOrd for Article {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Article {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message_id)
    }
}

impl fmt::Debug for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Article Message-ID={:?} attachments={} />",
            self.message_id,
            self.decoded.len(),
        )
    }
}

/// Posting iterator yielding wire-form byte blocks; see
/// [`Article::post_iter`].
pub struct ArticlePostIter<'a> {
    head: Option<Vec<u8>>,
    contents: std::slice::IterMut<'a, Content>,
    current: Option<PostIter<'a>>,
}

impl Iterator for ArticlePostIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(head) = self.head.take() {
            return Some(Ok(head));
        }
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(block) => return Some(block),
                    None => self.current = None,
                }
            }
            let content = self.contents.next()?;
            self.current = Some(content.post_iter(0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_group_normalization_and_dedupe() {
        let dir = tempdir().unwrap();
        let article = Article::new(dir.path()).with_groups(
            "convert.lead.2.gold.again,ConVert.lead.2.gold,convert.lead.2.gold,convert.lead.2.gold.again",
        );
        assert_eq!(article.groups().len(), 2);
        assert!(article.groups().contains("convert.lead.2.gold"));
        assert!(article.groups().contains("convert.lead.2.gold.again"));

        let mut article = Article::new(dir.path());
        assert!(article.add_group("Alt.Binaries.Test").unwrap());
        assert!(!article.add_group(" alt.binaries.test ").unwrap());
        assert!(article.add_group("####").is_err());
    }

    #[test]
    fn test_msgid_generation() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path());
        assert_eq!(article.message_id(), "");

        let first = article.msgid(false).to_string();
        assert!(first.starts_with('<') && first.ends_with('>'));
        assert_eq!(article.msgid(false), first);

        let second = article.msgid(true).to_string();
        assert_ne!(second, first);
        assert_eq!(article.message_id(), second);
    }

    #[test]
    fn test_post_iter_preconditions() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path()).with_subject("").with_poster("");
        article.body = "hello world".to_string();

        assert!(article.post_iter().is_none());
        article.add_group("alt.binaries.test").unwrap();
        assert!(article.post_iter().is_none());
        article.subject = "Subject".to_string();
        assert!(article.post_iter().is_none());
        article.poster = "l2g@nuxref.com".to_string();

        let blocks: Vec<Vec<u8>> = article.post_iter().unwrap().map(|b| b.unwrap()).collect();
        let head = String::from_utf8(blocks[0].clone()).unwrap();
        assert!(head.starts_with("Subject: Subject\r\n"));
        assert!(head.contains("Newsgroups: alt.binaries.test\r\n"));
        assert!(head.contains("Message-ID: <"));
        assert!(head.ends_with("\r\nhello world\r\n"));
    }

    #[test]
    fn test_post_iter_streams_contents() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path())
            .with_subject("s")
            .with_poster("p")
            .with_groups("alt.binaries.test");
        let mut content = Content::new(dir.path()).with_filename("a.txt");
        content.write(b"payload bytes").unwrap();
        content.close().unwrap();
        article.add(content);

        let blocks: Vec<Vec<u8>> = article.post_iter().unwrap().map(|b| b.unwrap()).collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1], b"payload bytes".to_vec());
    }

    #[test]
    fn test_load_response_extracts_header() {
        let dir = tempdir().unwrap();
        let mut response = Response::new(200, "Great Data");
        let mut header = Header::new();
        header.set("X-Test", "1");
        response.add(ResponseItem::Header(header));
        response.add(ResponseItem::Content(
            Content::new(dir.path()).with_filename("blob.bin"),
        ));

        let mut article = Article::new(dir.path());
        assert!(!article.is_valid());
        assert!(article.load_response(response));
        assert_eq!(article.len(), 1);
        assert_eq!(article.header().unwrap().get("x-test"), Some("1"));
    }

    #[test]
    fn test_load_article_overwrites_supplied_fields() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path())
            .with_subject("original-subject")
            .with_message_id("keep-me");

        let donor = Article::new(dir.path())
            .with_subject("new-subject")
            .with_poster("new-poster")
            .with_groups("a.b.c,d.e.f")
            .with_no(1001);

        assert!(article.load_article(donor));
        assert_eq!(article.subject, "new-subject");
        assert_eq!(article.poster, "new-poster");
        assert_eq!(article.no, 1001);
        assert_eq!(article.groups().len(), 2);
        // donor had no message id, so ours survives
        assert_eq!(article.message_id(), "keep-me");
    }

    #[test]
    fn test_article_split() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path())
            .with_subject("split-test")
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");

        assert!(matches!(article.split(512, 1024), Err(Error::EmptyContent)));

        let mut content = Content::new(dir.path()).with_filename("1MB.rar");
        content.write(&vec![7u8; 100_000]).unwrap();
        content.close().unwrap();
        article.add(content);

        assert!(article.split(0, 1024).is_err());
        assert!(article.split(512, 0).is_err());

        let results = article.split(50_000, 8192).unwrap();
        assert_eq!(results.len(), 2);
        for (i, child) in results.iter().enumerate() {
            assert_eq!(child.len(), 1);
            assert_eq!(child.get(0).unwrap().part(), i as u32 + 1);
            assert_eq!(child.get(0).unwrap().total_parts(), 2);
            assert_eq!(child.subject, "split-test");
        }
        // the split source is untouched
        assert_eq!(article.size().unwrap(), 100_000);
    }

    #[test]
    fn test_article_append_rejoins_split() {
        let dir = tempdir().unwrap();
        let mut article_a = Article::new(dir.path())
            .with_subject("split-test-a")
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");

        let source = dir.path().join("1MB.rar");
        fs::write(&source, vec![3u8; 120_000]).unwrap();
        assert!(article_a.add_file(&source).unwrap());
        assert_eq!(article_a.size().unwrap(), 120_000);

        let mut results = article_a.split(60_000, 8192).unwrap();

        let mut article_b = Article::new(dir.path())
            .with_subject("split-test-b")
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");
        assert_eq!(article_b.size().unwrap(), 0);
        for part in &mut results {
            article_b.append(part).unwrap();
        }

        assert_eq!(article_b.size().unwrap(), article_a.size().unwrap());
        assert_eq!(
            article_b.first_content_mut().unwrap().md5().unwrap(),
            article_a.first_content_mut().unwrap().md5().unwrap()
        );
    }

    #[test]
    fn test_article_copy_is_independent() {
        let dir = tempdir().unwrap();
        let mut article = Article::new(dir.path())
            .with_subject("woo-hoo")
            .with_poster("<noreply@newsreap.com>")
            .with_message_id("random-id")
            .with_groups("alt.binaries.l2g");

        let file_01 = dir.path().join("file01.tmp");
        let file_02 = dir.path().join("file02.tmp");
        fs::write(&file_01, vec![1u8; 1000]).unwrap();
        fs::write(&file_02, vec![2u8; 1000]).unwrap();

        let mut c1 = Content::from_path(&file_01, dir.path()).unwrap();
        c1.set_part(1);
        article.add(c1);
        let mut c2 = Content::from_path(&file_02, dir.path()).unwrap();
        c2.set_part(2);
        article.add(c2);
        assert_eq!(article.len(), 2);

        article.header_mut().set("Test", "test");
        article.header_mut().set("Another-Entry", "test2");

        let copy = article.copy().unwrap();
        assert_eq!(copy.len(), article.len());
        assert_eq!(copy.header().unwrap().len(), article.header().unwrap().len());

        article.header_mut().set("Yet-Another-Entry", "test3");
        assert_eq!(copy.header().unwrap().len() + 1, article.header().unwrap().len());
    }

    #[test]
    fn test_deobfuscate_precedence() {
        let dir = tempdir().unwrap();
        let tmp_file = dir.path().join("file.tmp");
        let rar_file = dir.path().join("file.rar");
        fs::write(&tmp_file, vec![0u8; 100]).unwrap();
        fs::write(&rar_file, vec![0u8; 100]).unwrap();

        // the attachment name takes priority over the subject-parsed name
        let mut article = Article::new(dir.path())
            .with_subject(r#""my test file" - testfile.rar yEnc (1/1)"#)
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");
        article.add_file(&rar_file).unwrap();
        assert_eq!(article.deobfuscate(None, None).as_deref(), Some("file.rar"));
        assert_eq!(
            article.deobfuscate(Some("mytest"), None).as_deref(),
            Some("mytest.rar")
        );

        // a second attachment makes the answer ambiguous
        article.add_file(&tmp_file).unwrap();
        assert_eq!(article.deobfuscate(None, None), None);

        // a useless attachment extension hands the subject the win
        let mut article = Article::new(dir.path())
            .with_subject(r#""my test file" - testfile.jpeg yEnc (1/1)"#)
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");
        article.add_file(&tmp_file).unwrap();
        assert_eq!(
            article.deobfuscate(None, None).as_deref(),
            Some("testfile.jpeg")
        );
        // disabling subject parsing falls back to the attachment
        assert_eq!(
            article.deobfuscate(None, Some(&[])).as_deref(),
            Some("file.tmp")
        );
        assert_eq!(
            article.deobfuscate(Some("abcd"), Some(&[])).as_deref(),
            Some("abcd.tmp")
        );
        assert_eq!(
            article.deobfuscate(Some("mytest"), None).as_deref(),
            Some("mytest.jpeg")
        );

        // unparseable subject leaves only the attachment
        let mut article = Article::new(dir.path())
            .with_subject(r#""a garbage unparseable subject"#)
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");
        article.add_file(&rar_file).unwrap();
        assert_eq!(article.deobfuscate(None, None).as_deref(), Some("file.rar"));

        // when both names carry real types, the attachment still wins
        let mut article = Article::new(dir.path())
            .with_subject(r#""my greatest picture" - l2g.png yEnc (1/1)"#)
            .with_poster("<noreply@newsreap.com>")
            .with_groups("alt.binaries.l2g");
        article.add_file(&rar_file).unwrap();
        assert_eq!(article.deobfuscate(None, None).as_deref(), Some("file.rar"));
    }

    #[test]
    fn test_sort_order() {
        let dir = tempdir().unwrap();
        let mut a = Article::new(dir.path()).with_message_id("a");
        let b = Article::new(dir.path()).with_message_id("b");
        assert!(a < b);

        // bumping the article number outranks the message id
        a.no += 1;
        assert!(a > b);
    }
}
