//! Shared helpers for the build and watch loops.

pub mod category;
