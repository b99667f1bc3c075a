//! Core engine for modcarve.
//!
//! This crate splits a monolithic program text into explicitly-linked
//! ES modules. It provides:
//! - A lexical scanner that classifies string/comment regions so brace
//!   matching and identifier search never trip over literals
//! - Brace-balanced symbol extraction with marker-comment backfill
//! - Module assembly (extracted symbols grouped by destination, leftover
//!   text becomes the residual module)
//! - Usage-driven import header regeneration and additive import repair
//! - Namespace rewriting of bare identifiers with dead-declaration excision
//! - Advisory lint passes for duplicate declarations and imports
//! - A source tree abstraction with content-hash write suppression

pub mod assemble;
pub mod error;
pub mod exports;
pub mod extract;
pub mod imports;
pub mod lint;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod rewrite;
pub mod scan;
pub mod store;
pub mod text;
