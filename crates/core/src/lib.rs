//! Domain types and pure logic for the moodboard collage service.
//!
//! Nothing in this crate performs I/O: it holds the error taxonomy, the
//! collage job model, presentation options, and the prompt compiler.

pub mod collage;
pub mod error;
pub mod export;
pub mod options;
pub mod prompt;
pub mod types;
