//! Core data model, errors, and HTML helpers shared by the composition engine.

pub mod errors;
pub mod html;
pub mod model;
