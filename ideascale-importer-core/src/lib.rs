#![doc = "ideascale-importer-core: mapping and transformation pipeline for IdeaScale fund imports."]

//! This crate holds the data models, the mapping engine and the import
//! pipeline. CLI parsing, config-file loading and subscriber setup live in the
//! `ideascale-importer` crate.
//!
//! # Layout
//! - [`mapping`], [`sanitize`], [`rewards`], [`authors`], [`assessment`]: leaf transforms
//! - [`compose`]: raw API objects to typed fund/challenge/proposal records
//! - [`export`]: output schemas and artifact writers
//! - [`contract`], [`fetch`]: the remote API seam and its HTTP implementation
//! - [`import`]: the orchestrating pipeline

pub mod assessment;
pub mod authors;
pub mod compose;
pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod fetch;
pub mod import;
pub mod mapping;
pub mod rewards;
pub mod sanitize;
