//! `varmark_core` is the macro-expansion engine behind
//! [varmark](https://github.com/ifiokjr/varmark). It scans plain text for
//! inline variable definitions (`%%name=expression%%`), evaluates each
//! expression left to right against the variables defined before it, and
//! wraps every reference (`{{name}}`) in a single up-to-date annotation
//! marker carrying the computed value.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Document text
//!   → Scanner (byte-level delimiter walk: ordered definitions + reference spans)
//!   → Evaluator (constrained arithmetic grammar, per-definition recovery)
//!   → Environment (name → value, rebuilt from scratch every run)
//!   → Reconciler (single-pass rewrite: rewrap stale markers, wrap bare refs)
//! ```
//!
//! One run is a pure, synchronous function from text to text. Nothing
//! persists between runs, so re-running the engine on its own output is a
//! byte-identical no-op and any prior corruption heals on the next run.
//!
//! ## Key Types
//!
//! - [`ProcessOutcome`] — the rewritten text plus resolution and
//!   diagnostic detail from one run.
//! - [`EngineSettings`] — marker class and lookback window for a run.
//! - [`MarkerSyntax`] — the inline markup vocabulary wrapping references.
//! - [`Environment`] / [`Value`] — the per-run variable bindings.
//! - [`VarmarkConfig`] — configuration loaded from `varmark.toml`.
//!
//! ## Quick Start
//!
//! ```rust
//! use varmark_core::process;
//!
//! let outcome = process("%%price=4%% %%total=price*3%% total: {{total}}");
//! assert!(outcome.changed);
//! assert!(outcome.text.contains("data-value=\"12\""));
//! ```

pub use config::*;
pub use engine::*;
pub use env::*;
pub use error::*;
pub use expr::*;
pub use marker::*;
pub use reconciler::*;
pub use scanner::*;

pub mod config;
mod engine;
mod env;
mod error;
mod expr;
mod marker;
mod reconciler;
pub mod scanner;

#[cfg(test)]
mod __tests;
