//! Bootstrap page for a tag.
//!
//! If `<asset_path>/<tag>.html` exists it is rendered as a template,
//! otherwise a minimal inline page opens the tag's socket and loads
//! `<tag>.js` from the tag's asset route.

use std::path::Path;

use webobs_core::error::AppError;
use webobs_core::result::AppResult;

pub use webobs_relay::registry::{RES_SUFFIX, WS_SUFFIX};

/// Values available to a page template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVars {
    /// `{{.Title}}`: the tag.
    pub title: String,
    /// `{{.Tagws}}`: `<tag>_ws`.
    pub tagws: String,
    /// `{{.ScriptPath}}`: `/<tag>_res/`.
    pub script_path: String,
    /// `{{.ScriptName}}`: `<tag>.js`.
    pub script_name: String,
}

impl PageVars {
    /// Variables for `tag`.
    pub fn for_tag(tag: &str) -> Self {
        Self {
            title: tag.to_string(),
            tagws: format!("{tag}{WS_SUFFIX}"),
            script_path: format!("/{tag}{RES_SUFFIX}/"),
            script_name: format!("{tag}.js"),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            ".Title" => Some(&self.title),
            ".Tagws" => Some(&self.tagws),
            ".ScriptPath" => Some(&self.script_path),
            ".ScriptName" => Some(&self.script_name),
            _ => None,
        }
    }
}

/// Substitutes `{{.Name}}` placeholders with HTML-escaped values.
///
/// Whitespace inside the braces is ignored. Unknown placeholders and
/// unterminated `{{` are copied through unchanged.
///
/// Escaping is for HTML text and attribute values only; it is not
/// context-aware. Inside a `<script>` string literal an escaped quote stays
/// as `&#34;`, so templates should only place values there for tags made
/// of plain URL-safe characters.
pub fn render_template(template: &str, vars: &PageVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match vars.lookup(after[..end].trim()) {
            Some(value) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// The page served when a tag has no template.
pub fn inline_page(vars: &PageVars) -> String {
    let ws_path = serde_json::to_string(&format!("/{}", vars.tagws))
        .unwrap_or_else(|_| "\"/\"".to_string());
    format!(
        "<h1>{title}</h1>\
         <script>var soc = new WebSocket(\"ws://\"+window.location.host+{ws_path});</script>\
         <script type=\"text/javascript\" src=\"{src}\"></script><body></body>",
        title = escape_html(&vars.title),
        src = escape_html(&format!("{}{}", vars.script_path, vars.script_name)),
    )
}

/// Renders the bootstrap page for `tag`, reading the template on every
/// call so edits show up without a restart.
pub async fn render_page(asset_path: &Path, tag: &str) -> AppResult<String> {
    let vars = PageVars::for_tag(tag);
    let template = asset_path.join(format!("{tag}.html"));

    match tokio::fs::read_to_string(&template).await {
        Ok(source) => Ok(render_template(&source, &vars)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(inline_page(&vars)),
        Err(e) => Err(AppError::with_source(
            webobs_core::error::ErrorKind::Internal,
            format!("Failed to read template '{}': {e}", template.display()),
            e,
        )),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
