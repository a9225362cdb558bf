//! Migration inventory core
//!
//! Tracks virtual-machine instances being moved from a source environment
//! to a target environment, grouped into batches by a membership predicate.
//! This crate is the batch-membership and state-consistency engine: the
//! criteria expression language, the entity registries with their
//! lifecycle guards, and the reconciler that keeps assignment in step with
//! criteria and attributes. Migration execution itself (disk transfer,
//! hypervisor APIs) lives outside and only flips the statuses this crate
//! treats as guards.

pub mod criteria;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod reconcile;
pub mod registry;

pub use criteria::{evaluate, CompiledExpression, ExpressionError};
pub use error::{Error, Result};
pub use infrastructure::database::Database;
pub use reconcile::{reconcile_batch, ReconcileSummary};
