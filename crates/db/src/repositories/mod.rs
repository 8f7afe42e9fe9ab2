//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod event_repo;
pub mod layout_repo;
pub mod photo_request_repo;

pub use event_repo::EventRepo;
pub use layout_repo::LayoutRepo;
pub use photo_request_repo::PhotoRequestRepo;
