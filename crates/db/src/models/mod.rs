//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//!
//! Optional document fields stay `Option<T>` end to end; readers apply
//! explicit defaults instead of assuming presence.

pub mod event;
pub mod layout;
pub mod photo_request;
