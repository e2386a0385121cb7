//! NewsReap article content core
//!
//! This crate implements the content machinery behind retrieving, decoding,
//! assembling and posting binary attachments distributed across Usenet
//! (NNTP) articles:
//!
//! - **[`Content`]**: streaming payloads backed by scope-guarded temp files
//!   (or memory), with attach/detach lifetime semantics, split/append/copy/
//!   save operations and hashing.
//! - **[`CodecYenc`]**: the streaming yEnc decoder and encoder, with
//!   per-part and whole-file CRC32 verification plus the Usenet subject-line
//!   parser.
//! - **[`Header`]**: the case-insensitive, order-preserving article header
//!   map.
//! - **[`Article`]**: one article binding subject, poster, groups and
//!   Message-ID to an ordered content set.
//! - **[`SegmentedPost`]**: the ordered article group that reassembles one
//!   multi-part binary.
//!
//! The decode pipeline runs fetched article bodies through
//! [`CodecYenc::decode`] into per-part [`Content`], collects the parts into
//! a [`SegmentedPost`] and joins them into the final file. The encode
//! pipeline splits a source [`Content`], encodes each part and wraps every
//! part in an [`Article`] ready for posting.
//!
//! The core is single-threaded cooperative: no shared mutable state is
//! exposed, and independent article pipelines are parallelized by running
//! each with its own codec and content instances.

pub mod article;
pub mod content;
pub mod error;
pub mod group;
pub mod header;
pub mod response;
pub mod segment;
pub mod util;
pub mod yenc;

pub use article::{Article, ArticlePostIter};
pub use content::{Content, ContentKind, DEFAULT_BLOCK_SIZE, FileMode, PostIter};
pub use error::{Error, Result};
pub use group::Group;
pub use header::Header;
pub use response::{Response, ResponseItem};
pub use segment::SegmentedPost;
pub use yenc::{CodecYenc, ParsedSubject, parse_subject};
