//! Utility functions for string comparison.

pub mod format;

pub use format::cmp_ignore_case;
