//! Batch - a named group of instances sharing a migration window and target

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A migration batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
	/// Surrogate ID, assigned on persist
	pub id: Option<i64>,

	/// Unique batch name
	pub name: String,

	/// Lifecycle status
	pub status: BatchStatus,

	/// Membership predicate; the single source of truth for which
	/// instances belong to this batch
	pub include_expression: String,

	/// Migration window
	pub window_start: Option<DateTime<Utc>>,
	pub window_end: Option<DateTime<Utc>>,

	/// Target environment this batch migrates into
	pub target_id: Option<i64>,
	pub target_project: String,

	/// Placement defaults on the target
	pub storage_pool: String,
	pub default_network: String,
}

/// Batch lifecycle status
///
/// Created in `Defined`; the external migration executor moves a batch to
/// `Running` when work begins and to `Finished`/`Error` on completion.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Serialize,
	Deserialize,
	strum::Display,
	strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum BatchStatus {
	Defined,
	Running,
	Finished,
	Error,
}

impl Batch {
	pub fn new(name: impl Into<String>, include_expression: impl Into<String>) -> Self {
		Self {
			id: None,
			name: name.into(),
			status: BatchStatus::Defined,
			include_expression: include_expression.into(),
			window_start: None,
			window_end: None,
			target_id: None,
			target_project: String::new(),
			storage_pool: String::new(),
			default_network: String::new(),
		}
	}

	/// Only batches outside a migration phase may be modified or deleted
	pub fn can_be_modified(&self) -> bool {
		match self.status {
			BatchStatus::Defined | BatchStatus::Finished | BatchStatus::Error => true,
			BatchStatus::Running => false,
		}
	}

	/// Surrogate ID, or `NotPersisted` if the batch has never been saved
	pub fn required_id(&self) -> Result<i64> {
		self.id.ok_or(Error::NotPersisted("batch"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_batch_is_defined_and_modifiable() {
		let batch = Batch::new("week1", "true");
		assert_eq!(batch.status, BatchStatus::Defined);
		assert!(batch.can_be_modified());
		assert!(batch.required_id().is_err());
	}

	#[test]
	fn only_running_blocks_modification() {
		let mut batch = Batch::new("week1", "true");
		for (status, modifiable) in [
			(BatchStatus::Defined, true),
			(BatchStatus::Running, false),
			(BatchStatus::Finished, true),
			(BatchStatus::Error, true),
		] {
			batch.status = status;
			assert_eq!(batch.can_be_modified(), modifiable, "{status}");
		}
	}

	#[test]
	fn status_round_trips_through_strings() {
		use std::str::FromStr;
		for status in [
			BatchStatus::Defined,
			BatchStatus::Running,
			BatchStatus::Finished,
			BatchStatus::Error,
		] {
			assert_eq!(BatchStatus::from_str(&status.to_string()).unwrap(), status);
		}
	}
}
