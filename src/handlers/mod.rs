//! HTTP handlers for items and probes.

pub mod items;
pub mod probe;
