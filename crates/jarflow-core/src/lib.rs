//! jarflow core
//!
//! Project model, KDL parser, Gradle-compatible version catalog and the
//! task graph that orders the build pipeline.

pub mod catalog;
pub mod classpath;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod variables;

pub use catalog::VersionCatalog;
pub use classpath::resolve_declarations;
pub use error::{ProjectError, Result};
pub use graph::{Task, TaskGraph};
pub use loader::{LoadedProject, load_project};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use variables::expand_variables;
