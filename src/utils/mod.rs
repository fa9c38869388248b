//! Utility functions shared across the codebase

pub mod text;

// Re-export commonly used utilities
pub use text::truncate_chars;
