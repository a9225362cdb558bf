//! Domain entities owned by the registries
//!
//! These are plain structs handed across the crate boundary; persistence
//! details (surrogate IDs, sentinel encodings) stay behind the registries.

pub mod batch;
pub mod certificate;
pub mod instance;
pub mod instance_override;
pub mod network;
pub mod source;
pub mod target;

pub use batch::{Batch, BatchStatus};
pub use certificate::Certificate;
pub use instance::{Instance, InstanceDisk, InstanceNic, MigrationStatus};
pub use instance_override::InstanceOverride;
pub use network::Network;
pub use source::{Source, SourceProperties, VmwareProperties};
pub use target::Target;
