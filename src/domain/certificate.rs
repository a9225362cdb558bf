//! Certificate - a trusted certificate record, keyed by fingerprint

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
	/// Unique SHA-256 fingerprint
	pub fingerprint: String,
	pub cert_type: String,
	pub name: String,
	pub description: String,
	/// PEM-encoded certificate
	pub certificate: String,
}
