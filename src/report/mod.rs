//! Rendering of records and results for the terminal.

mod generator;

pub use generator::*;
