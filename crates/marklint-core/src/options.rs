use serde::{Deserialize, Serialize};

/// Feature toggles for the optional GFM extensions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParseOptions {
    /// `~text~` and `~~text~~` become strikethrough spans.
    pub strikethrough: bool,
    /// `[ ]` / `[x]` at the start of a list item become task markers.
    pub task_list_items: bool,
    /// Bare `www.`, `http(s)://` and email addresses become autolinks.
    pub autolink_literals: bool,
    /// A leading `---` block is metadata rather than markdown.
    pub front_matter: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strikethrough: true,
            task_list_items: true,
            autolink_literals: true,
            front_matter: false,
        }
    }
}

impl ParseOptions {
    /// Plain CommonMark with every extension switched off.
    pub fn commonmark() -> Self {
        Self {
            strikethrough: false,
            task_list_items: false,
            autolink_literals: false,
            front_matter: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HtmlOptions {
    /// Escape the raw HTML tags GFM disallows (`<script>`, `<iframe>`, ...).
    pub tag_filter: bool,
}
