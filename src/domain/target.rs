//! Target - the environment instances migrate into

use serde::{Deserialize, Serialize};

/// A target environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
	/// Surrogate ID, assigned on persist
	pub id: Option<i64>,
	/// Unique target name
	pub name: String,
	pub endpoint: String,
	pub tls_client_key: String,
	pub tls_client_cert: String,
	/// Serialized OIDC token set, when OIDC auth is in use
	pub oidc_tokens: Option<String>,
	pub insecure: bool,
	pub profile: String,
	pub project: String,
}

impl Target {
	pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
		Self {
			id: None,
			name: name.into(),
			endpoint: endpoint.into(),
			tls_client_key: String::new(),
			tls_client_cert: String::new(),
			oidc_tokens: None,
			insecure: false,
			profile: String::new(),
			project: String::new(),
		}
	}
}
