use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use seqfetch_engine::Pagination;

/// Scripted search session, loaded from RON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub pagination: Pagination,
    /// Successive contents of the search box.
    pub keystrokes: Vec<String>,
    pub typing_interval_ms: u64,
    pub debounce_ms: u64,
    /// Page to flip to once the search settles; 0 skips the flip.
    pub then_page: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            pagination: Pagination {
                data_field: "data.list".to_string(),
                page_size: 3,
                ..Pagination::default()
            },
            keystrokes: ["b", "bo", "bol", "bolt"].map(String::from).to_vec(),
            typing_interval_ms: 40,
            debounce_ms: 0,
            then_page: 2,
        }
    }
}

impl DemoConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading demo config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing demo config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }
}
