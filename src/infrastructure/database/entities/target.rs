//! Target entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Target;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "targets")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i64,
	#[sea_orm(unique)]
	pub name: String,
	pub endpoint: String,
	pub tls_key: String,
	pub tls_cert: String,
	pub oidc_tokens: Option<String>,
	pub insecure: bool,
	pub profile: String,
	pub project: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	pub fn to_domain(&self) -> Target {
		Target {
			id: Some(self.id),
			name: self.name.clone(),
			endpoint: self.endpoint.clone(),
			tls_client_key: self.tls_key.clone(),
			tls_client_cert: self.tls_cert.clone(),
			oidc_tokens: self.oidc_tokens.clone(),
			insecure: self.insecure,
			profile: self.profile.clone(),
			project: self.project.clone(),
		}
	}
}
