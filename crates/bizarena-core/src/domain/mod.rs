//! Domain models for bizarena.
//!
//! Canonical definitions for:
//! - `Criterion`: a weighted evaluation dimension from the criteria parser
//! - `AgentCategory`: business domains with default criteria and weights
//! - `ArenaError` / `CollaboratorError` / `ScoringError`: error taxonomy

pub mod category;
pub mod criterion;
pub mod error;

pub use category::{merge_custom_criteria, AgentCategory};
pub use criterion::{validate_criteria, Criterion};
pub use error::{ArenaError, CollabResult, CollaboratorError, Result, ScoringError};
