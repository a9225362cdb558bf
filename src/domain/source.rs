//! Source - the environment instances are inventoried from

use serde::{Deserialize, Serialize};

/// A source environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
	/// Surrogate ID, assigned on persist
	pub id: Option<i64>,
	/// Unique source name
	pub name: String,
	pub properties: SourceProperties,
}

/// Connection properties per source kind
///
/// A closed set: adding a kind means updating every match on it, which is
/// exactly the point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceProperties {
	/// No connection details beyond the name
	Common,
	Vmware(VmwareProperties),
}

/// vCenter/ESXi connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmwareProperties {
	pub endpoint: String,
	pub username: String,
	pub password: String,
	#[serde(default)]
	pub insecure: bool,
}

impl SourceProperties {
	/// Stable discriminator stored in the `type` column
	pub fn kind(&self) -> &'static str {
		match self {
			SourceProperties::Common => "common",
			SourceProperties::Vmware(_) => "vmware",
		}
	}
}

impl Source {
	pub fn new(name: impl Into<String>, properties: SourceProperties) -> Self {
		Self {
			id: None,
			name: name.into(),
			properties,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn properties_round_trip_as_json() {
		let props = SourceProperties::Vmware(VmwareProperties {
			endpoint: "https://vcenter01:443".into(),
			username: "admin".into(),
			password: "secret".into(),
			insecure: true,
		});
		let text = serde_json::to_string(&props).unwrap();
		let back: SourceProperties = serde_json::from_str(&text).unwrap();
		match back {
			SourceProperties::Vmware(v) => {
				assert_eq!(v.endpoint, "https://vcenter01:443");
				assert!(v.insecure);
			}
			other => panic!("wrong variant: {other:?}"),
		}
	}
}
