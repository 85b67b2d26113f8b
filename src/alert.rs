//! Deadline alert core: window matching, message rendering and run outcomes.

pub mod outcome;
pub mod render;
pub mod window;
