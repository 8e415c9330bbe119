//! Configuration module for the Halldyll plan engine.
//!
//! This module handles all configuration-related functionality:
//! - The evaluated [`ResourceConfig`] handed to the diff engine
//! - Parsing and deserializing scenario files
//! - Validation of scenarios before they are planned

mod parser;
mod resource;
mod scenario;
mod validator;

pub use parser::{ENV_CREATE_BEFORE_DESTROY, ENV_STUB, ScenarioParser};
pub use resource::ResourceConfig;
pub use scenario::{ConfigSpec, DiagnosticSpec, PriorSpec, ResponseSpec, Scenario};
pub use validator::{ScenarioValidator, ValidationError, ValidationResult};
