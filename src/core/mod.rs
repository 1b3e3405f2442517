//! Core XML scanning primitives
//!
//! This module contains the byte-level building blocks shared by the indexer
//! and the edit checks:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Encoding: BOM and declared-encoding detection
//! - Checker: quick single-pass syntax check for edited snippets

pub mod checker;
pub mod encoding;
pub mod scanner;
