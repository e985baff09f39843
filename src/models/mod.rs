//! Data models for the teacher portfolio backend.
//!
//! Field names match the dashboard's JSON objects so exported files stay interchangeable.

mod category;
mod evidence;
mod profile;

pub use category::*;
pub use evidence::*;
pub use profile::*;
