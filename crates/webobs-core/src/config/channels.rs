//! Tags bound at start-up by the server binary.

use serde::{Deserialize, Serialize};

/// A single tag binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBinding {
    /// Tag name. Serves `/<tag>`, `/<tag>_ws` and `/<tag>_res/`.
    pub tag: String,
    /// Directory holding `<tag>.html`, `<tag>.js` and other assets.
    #[serde(default = "default_asset_path")]
    pub asset_path: String,
}

/// Start-up channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Tags to bind when the server starts.
    #[serde(default)]
    pub bindings: Vec<ChannelBinding>,
    /// Bind a listener on every configured tag that echoes inbound
    /// payloads back to all sessions of the same tag.
    #[serde(default)]
    pub echo: bool,
}

fn default_asset_path() -> String {
    "./public".to_string()
}
