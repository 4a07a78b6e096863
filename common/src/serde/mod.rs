//! Serde helpers for fields that need a human readable representation.

pub mod duration;
