//! Data types shared between discovery, extraction and the fetch pool.

pub mod chapter;
pub mod config;
