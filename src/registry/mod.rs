//! Entity registries
//!
//! Each module owns CRUD and validation for one entity family. Every
//! function is generic over [`sea_orm::ConnectionTrait`]: pass the plain
//! connection for a standalone operation, or a transaction from
//! [`crate::Database::begin`] to compose several operations into one atomic
//! unit. Composite operations (batch delete cascading to unassignment,
//! instance delete cascading to its override) run entirely on the
//! connection they are given, so the caller controls the commit.

pub mod batch;
pub mod certificate;
pub mod config;
pub mod instance;
pub mod instance_override;
pub mod network;
pub mod source;
pub mod target;
