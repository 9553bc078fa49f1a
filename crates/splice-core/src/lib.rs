//! Splice Core - Foundation types for timeline editing
//!
//! This crate provides the fundamental types used throughout Splice:
//! - Time representation (RationalTime, TimeRange)
//! - Zoom mapping between timeline time and pixels
//! - Editor settings
//! - The shared error type

pub mod error;
pub mod settings;
pub mod time;
pub mod zoom;

pub use error::{Result, SpliceError};
pub use settings::EditorSettings;
pub use time::{RationalTime, TimeRange};
pub use zoom::Zoom;
