//! Dataset ingestion and option translation for a Weka-style engine.
//!
//! Training and inference belong to the engine behind [`facade::Engine`].
//! This crate turns rows, JSON datasets or file paths into typed
//! [`Dataset`]s, and permissive option objects into ordered flag tokens.

pub mod config;
pub mod data;
pub mod error;
pub mod facade;
pub mod options;

pub use config::{FacadeConfig, OptionPolicy};
pub use data::loader::DataSource;
pub use data::model::{Attribute, AttributeType, Cell, ClassSetup, Dataset, Value};
pub use error::{Error, Result};
pub use facade::{Engine, Facade};
pub use options::{translate, ConfigObject, OptionSpec, Output, Translation};
