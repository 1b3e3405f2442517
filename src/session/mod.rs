//! Session layer
//!
//! Orchestration on top of the core: the [`Session`] context object,
//! validation, saving and debounced background passes.

mod cache;
pub mod saver;
pub mod scheduler;
pub mod state;
pub mod validate;

pub use saver::{save_stream, SaveReport};
pub use scheduler::ValidationScheduler;
pub use state::Session;
pub use validate::{
    link_errors, run_validator, validate_files, SchemaValidator, ValidationReport, WellFormedness,
};
