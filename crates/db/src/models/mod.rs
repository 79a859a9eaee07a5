//! Row structs and insert DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` row struct matching the database row
//! - A create DTO for inserts, converted from the core domain types

pub mod telemetry;
