#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

//! ragdb-core
//!
//! Domain types, error taxonomy, collaborator traits, configuration and the
//! document processor shared by the text, vector and hybrid crates.

pub mod config;
pub mod data_processor;
pub mod error;
pub mod extract;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Document, RankedResult, SourceKind};
