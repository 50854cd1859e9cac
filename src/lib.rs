//! Page digest: extract a web page and run AI text transforms over it.
//!
//! Transforms (summarize, rewrite, proofread, write, answer) always produce
//! English. Other display languages are derived from that English result by
//! a translation adapter, and the output is rendered as a small HTML card.

pub mod capability;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod i18n;
pub mod openai;
pub mod render;
pub mod session;
pub mod testing;
pub mod translation;
