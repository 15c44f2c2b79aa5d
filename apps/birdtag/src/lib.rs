//! # birdtag
//!
//! HTTP envelope, CLI, and configuration around `birdtag-core`.

pub mod api;
pub mod cli;
pub mod config;
