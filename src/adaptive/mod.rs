//! Adaptive testing core: IRT probability, mastery tracking with forgetting,
//! question selection, the skill-tree state machine and review scheduling.
//!
//! Everything except [`engine`] is a pure function over explicit snapshots.

pub mod ability;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod irt;
pub mod progress;
pub mod review;
pub mod selector;
pub mod types;
