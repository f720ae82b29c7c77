//! Utility modules for feature normalization
//!
//! - Categorical: synonym tables that turn text answers into 0/1 flags
//! - Column aliases: header names accepted for each feature in tabular input

pub mod categorical;
pub mod column_aliases;

// Re-export commonly used functions
pub use categorical::{encode, is_recognized};
pub use column_aliases::resolve_columns;
