//! Certificate entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::Certificate;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "certificates")]
pub struct Model {
	#[sea_orm(primary_key, auto_increment = false)]
	pub fingerprint: String,
	#[sea_orm(column_name = "type")]
	pub cert_type: String,
	pub name: String,
	pub description: String,
	pub certificate: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
	pub fn to_domain(&self) -> Certificate {
		Certificate {
			fingerprint: self.fingerprint.clone(),
			cert_type: self.cert_type.clone(),
			name: self.name.clone(),
			description: self.description.clone(),
			certificate: self.certificate.clone(),
		}
	}
}
