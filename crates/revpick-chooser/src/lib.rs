//! Revision selection for revpick.
//!
//! Turns an ordered list of branch specs into the single revision a build
//! should check out, using one of two strategies:
//! - first match: the first spec that finds anything wins
//! - most recent: the newest commit found by any spec wins

/// Log a chooser decision at `info` when verbose, `debug` otherwise.
macro_rules! verbose {
    ($verbosity:expr, $($arg:tt)+) => {
        if $verbosity.is_verbose() {
            tracing::info!($($arg)+)
        } else {
            tracing::debug!($($arg)+)
        }
    };
}

pub mod chooser;
pub mod error;
pub mod locator;
pub mod spec;
pub mod strategy;

pub use chooser::{BuildChooser, SelectRequest, Verbosity};
pub use error::{ChooserError, Result};
pub use locator::{CandidateLocator, LocateMode};
pub use spec::{BranchSpec, SpecKind};
pub use strategy::Strategy;
