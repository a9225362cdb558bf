//! Network - a named network definition instances can attach to

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
	/// Surrogate ID, assigned on persist
	pub id: Option<i64>,
	/// Unique network name
	pub name: String,
	pub config: Json,
}

impl Network {
	pub fn new(name: impl Into<String>, config: Json) -> Self {
		Self {
			id: None,
			name: name.into(),
			config,
		}
	}
}
