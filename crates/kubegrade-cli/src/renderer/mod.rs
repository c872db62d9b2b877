//! Scorecard renderers
//!
//! Every renderer consumes only the Scorecard and returns the finished
//! output as a string.

pub mod ci;
pub mod human;
pub mod json;
pub mod sarif;
