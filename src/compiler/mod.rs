//! Content compilation: reading sources and turning them into records.
//!
//! # Module Structure
//!
//! | Module          | Purpose                                              |
//! |-----------------|------------------------------------------------------|
//! | `content`       | content file → [`ContentRecord`]                     |
//! | `front_matter`  | YAML metadata block                                  |
//! | `markdown`      | markdown body → HTML                                 |
//! | `route`         | content path → site route and output path            |
//! | `dependencies`  | templates and components → registries                |
//! | `assets`        | byte-for-byte file copies                            |

pub mod assets;
pub mod content;
pub mod dependencies;
pub mod front_matter;
pub mod markdown;
pub mod route;

pub use content::{ContentCompiler, ContentRecord};

use std::path::Path;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Whether `path` is compiled as markdown (everything else is copied).
pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MARKDOWN_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)))
}
