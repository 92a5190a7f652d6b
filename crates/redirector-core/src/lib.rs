//! Link-rewrite engine for markdown vaults.
//!
//! The engine reconciles already-parsed link occurrences against a canonical
//! link policy and rewrites document text in place. Everything it needs from
//! its host is expressed by the traits in [`host`]; [`vault::MemoryVault`] and
//! the [`link_parser`], [`doc_resolver`] and [`link_text`] modules provide a
//! reference host.

pub mod doc_resolver;
pub mod error;
pub mod host;
pub mod line_split;
pub mod link;
pub mod link_formatter;
pub mod link_parser;
pub mod link_text;
pub mod rewrite_plan;
pub mod rewriter;
pub mod span_order;
pub mod vault;

pub use error::{Error, HostError, Result};
pub use link::{
    Document, DocumentId, LinkKind, LinkOccurrence, LinkVariant, Position, ResolvedLinkRewrite, Span,
};
pub use link_formatter::{FormatOptions, FormatReport, LinkFormatter};
