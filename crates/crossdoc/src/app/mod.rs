//! Application layer: the composition engine and the site generator driving it.

pub mod annotate;
pub mod defs;
pub mod scan;
pub mod segments;
pub mod site;
pub mod toc;
