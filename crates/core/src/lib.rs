//! Shelfvision domain core.
//!
//! Pure domain types shared across the workspace: ID and timestamp
//! aliases, the [`CoreError`](error::CoreError) domain error, and the
//! evidence reference validator/classifier ([`reference`]).
//!
//! This crate performs no I/O.

pub mod error;
pub mod reference;
pub mod types;
