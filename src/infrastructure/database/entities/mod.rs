//! Sea-ORM entity definitions
//!
//! These map our domain models to database tables. The storage layer keeps
//! the `-1` sentinel for "no associated row"; the conversions here translate
//! it to and from `Option<i64>` so nothing above the registries ever sees
//! the sentinel.

pub mod batch;
pub mod certificate;
pub mod config;
pub mod instance;
pub mod instance_override;
pub mod network;
pub mod source;
pub mod target;

// Re-export all entities
pub use batch::Entity as Batch;
pub use certificate::Entity as Certificate;
pub use config::Entity as Config;
pub use instance::Entity as Instance;
pub use instance_override::Entity as InstanceOverride;
pub use network::Entity as Network;
pub use source::Entity as Source;
pub use target::Entity as Target;

/// Reserved ID meaning "no associated row" for nullable reference columns
pub const INVALID_ID: i64 = -1;

/// Domain `Option<i64>` to stored sentinel form
pub fn id_to_db(id: Option<i64>) -> i64 {
	id.unwrap_or(INVALID_ID)
}

/// Stored sentinel form to domain `Option<i64>`
pub fn id_from_db(id: i64) -> Option<i64> {
	if id == INVALID_ID {
		None
	} else {
		Some(id)
	}
}
