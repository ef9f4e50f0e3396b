//! Configuration management for pagesmith
//!
//! Configuration is read once at startup into an immutable [`Config`] value that
//! is passed explicitly to every component. Sources, highest precedence first:
//! CLI flags, environment, `pagesmith.toml`, built-in defaults. Credentials are
//! only ever read from the environment.

mod builder;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use model::*;
pub use sources::{CliOverrides, DEFAULT_CONFIG_FILE, read_file};
