//! Infrastructure layer - persistence behind the registries

pub mod database;
