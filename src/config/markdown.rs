//! `[markdown]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[markdown]` section in weft.toml - rendering extensions.
///
/// # Example
/// ```toml
/// [markdown]
/// highlight_theme = "InspiredGitHub"
/// hard_wraps = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Theme for fenced code blocks. Unknown names leave code unhighlighted.
    #[serde(default = "defaults::markdown::highlight_theme")]
    #[educe(Default = defaults::markdown::highlight_theme())]
    pub highlight_theme: String,

    /// Turn every soft line break into `<br />`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub hard_wraps: bool,

    /// `$inline$` and `$$display$$` math spans.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub math: bool,

    /// `id` attributes on headings.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub heading_anchors: bool,

    /// Link bare `http(s)://` URLs in text.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub autolinks: bool,
}
