//! Helpers for shaping content to the platform's limits.

pub mod text;
