//! Instance override - user-supplied corrections for one instance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-supplied attribute overrides for one instance, keyed 1:1 by the
/// instance UUID. Lives and dies with its instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceOverride {
	pub uuid: Uuid,
	pub last_update: DateTime<Utc>,
	pub comment: String,
	pub number_cpus: Option<i64>,
	pub memory_in_bytes: Option<i64>,
}

impl InstanceOverride {
	pub fn new(uuid: Uuid) -> Self {
		Self {
			uuid,
			last_update: Utc::now(),
			comment: String::new(),
			number_cpus: None,
			memory_in_bytes: None,
		}
	}
}
