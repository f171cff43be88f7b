//! KDL configuration parsing for revpick.
//!
//! This crate handles parsing of:
//! - The chooser strategy and branch specs (revpick.kdl)
//! - Repository location
//! - Build variables for spec expansion

pub mod chooser;
pub mod error;

pub use chooser::{ChooserConfig, RepositoryConfig, load_chooser_config, parse_chooser_config};
pub use error::{ConfigError, ConfigResult};
