//! Files embedded in the binary and copied next to every generated site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub const VIEW_TEMPLATE: &str = include_str!("../../assets/view.html");
pub const STYLESHEET_NAME: &str = "crossdoc.css";
pub const SCRIPT_NAME: &str = "crossdoc.js";

const STYLESHEET: &str = include_str!("../../assets/crossdoc.css");
const SCRIPT: &str = include_str!("../../assets/crossdoc.js");

/// Write the stylesheet and script into `out_dir`.
pub fn write_static(out_dir: &Path) -> Result<()> {
    for (name, contents) in [(STYLESHEET_NAME, STYLESHEET), (SCRIPT_NAME, SCRIPT)] {
        let path = out_dir.join(name);
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
