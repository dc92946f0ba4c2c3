//! Core trait abstractions for the extraction library.
//!
//! These traits define the capabilities the application provides to the
//! pipeline: page rendering and DOM queries.

pub mod browser;
