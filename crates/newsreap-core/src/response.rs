//! Fetched-article response shape
//!
//! The NNTP transport (out of scope here) hands decoded fetch results to
//! [`crate::Article::load_response`] in this form: a status line, the raw
//! textual body, and the decoded items found within it. Items mix header
//! blocks and payloads, so they travel as a sum type sharing the content
//! sort-key contract.

use crate::content::{Content, HEADER_SORT_NO};
use crate::header::Header;

/// One decoded item within a response.
#[derive(Debug)]
pub enum ResponseItem {
    /// An article header block.
    Header(Header),
    /// A payload (binary or ASCII).
    Content(Content),
}

impl ResponseItem {
    /// Sort key compatible with [`Content::sort_key`]; headers use a low
    /// tier so they always order ahead of payloads.
    pub fn sort_key(&self) -> String {
        match self {
            ResponseItem::Header(_) => format!("{HEADER_SORT_NO:05}//00000"),
            ResponseItem::Content(content) => content.sort_key(),
        }
    }

    /// `true` when this item is a header block.
    pub fn is_header(&self) -> bool {
        matches!(self, ResponseItem::Header(_))
    }
}

/// A fetched article: status, body text and decoded items.
#[derive(Debug, Default)]
pub struct Response {
    /// NNTP status code of the fetch.
    pub code: u16,
    /// Status reason phrase.
    pub reason: String,
    /// The non-decoded textual body.
    pub body: String,
    decoded: Vec<ResponseItem>,
}

impl Response {
    /// Create a response with a status line.
    pub fn new(code: u16, reason: &str) -> Self {
        Self {
            code,
            reason: reason.to_string(),
            body: String::new(),
            decoded: Vec::new(),
        }
    }

    /// Add a decoded item, keeping the set ordered by sort key.
    pub fn add(&mut self, item: ResponseItem) {
        let key = item.sort_key();
        let idx = self
            .decoded
            .partition_point(|existing| existing.sort_key() <= key);
        self.decoded.insert(idx, item);
    }

    /// Decoded items in sort-key order.
    pub fn decoded(&self) -> &[ResponseItem] {
        &self.decoded
    }

    /// Consume the response, yielding its decoded items in order.
    pub fn into_decoded(self) -> Vec<ResponseItem> {
        self.decoded
    }

    /// Number of decoded items.
    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    /// `true` when nothing was decoded.
    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }
}
