//! Filesystem helpers: input enumeration.

pub mod walker;
