//! Infrastructure adapters for config, highlighting, analyzers, and bundled assets.

pub mod analyzer;
pub mod assets;
pub mod config;
pub mod highlight;
pub mod srclib;
