//! Plugin definitions and the collaborators the compiler calls out to.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grammar::TEMPLATE_FIELD_RE;

/// Templates of an interactive plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginDef {
    /// Emitted once per document (scripts, styles)
    pub head: String,
    /// Emitted before the first embed in a file
    pub top: String,
    /// Emitted for every embed
    pub body: String,
    /// Button markup shown with the body
    pub button: String,
    /// Regex an answer's plugin argument must match
    pub arg_pattern: Option<String>,
}

/// Plugins known to a run, by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginRegistry {
    defs: BTreeMap<String, PluginDef>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin definition
    pub fn with(mut self, name: impl Into<String>, def: PluginDef) -> Self {
        self.insert(name, def);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, def: PluginDef) {
        self.defs.insert(name.into(), def);
    }

    pub fn get(&self, name: &str) -> Option<&PluginDef> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Values substituted into `{{field}}` placeholders
#[derive(Debug, Clone)]
pub struct TemplateFields<'a> {
    pub name: &'a str,
    pub slide_id: &'a str,
    pub args: &'a str,
    pub file_number: usize,
}

impl TemplateFields<'_> {
    pub const NAMES: &'static [&'static str] = &[
        "pluginName",
        "pluginId",
        "pluginLabel",
        "pluginArgs",
        "pluginSlide",
        "pluginNumber",
    ];

    fn get(&self, field: &str) -> Option<String> {
        Some(match field {
            "pluginName" => self.name.to_string(),
            "pluginId" => format!("{}-plugin-{}", self.slide_id, self.name),
            "pluginLabel" => format!("slidoc-plugin-{}", self.name),
            "pluginArgs" => self.args.to_string(),
            "pluginSlide" => self.slide_id.to_string(),
            "pluginNumber" => self.file_number.to_string(),
            _ => return None,
        })
    }
}

/// Fill `{{field}}` placeholders. An unknown field is an error.
pub fn substitute(template: &str, fields: &TemplateFields) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in TEMPLATE_FIELD_RE.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = fields
            .get(name.as_str())
            .ok_or_else(|| format!("unknown template field '{}'", name.as_str()))?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Field names a template refers to, in order of first use
pub fn template_fields(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in TEMPLATE_FIELD_RE.captures_iter(template) {
        let name = caps[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// External syntax highlighter for fenced code
pub trait Highlighter: Send + Sync {
    /// Highlighted HTML, or `None` when the language is unknown
    fn highlight(&self, code: &str, language: Option<&str>) -> Option<String>;
}

/// Where an image is referenced from
#[derive(Debug, Clone, Copy)]
pub struct ImageContext<'a> {
    pub file: &'a str,
    pub slide_id: &'a str,
}

/// External asset lookup; the compiler never touches the filesystem
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, path: &str, context: ImageContext<'_>) -> Option<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> TemplateFields<'static> {
        TemplateFields {
            name: "Graph",
            slide_id: "slidoc01-03",
            args: "1, 2",
            file_number: 1,
        }
    }

    #[test]
    fn test_substitute() {
        let out = substitute(
            r#"<div id="{{pluginId}}" class="{{ pluginLabel }}" data-args="{{pluginArgs}}"></div>"#,
            &fields(),
        )
        .unwrap();
        assert_eq!(
            out,
            r#"<div id="slidoc01-03-plugin-Graph" class="slidoc-plugin-Graph" data-args="1, 2"></div>"#
        );
    }

    #[test]
    fn test_unknown_field_fails() {
        let err = substitute("{{pluginColor}}", &fields()).unwrap_err();
        assert!(err.contains("pluginColor"));
    }

    #[test]
    fn test_template_fields() {
        assert_eq!(
            template_fields("{{pluginId}} {{pluginArgs}} {{pluginId}}"),
            vec!["pluginId", "pluginArgs"]
        );
    }

    #[test]
    fn test_registry_from_json() {
        let reg: PluginRegistry = serde_json::from_str(
            r#"{"Graph": {"body": "<canvas></canvas>", "arg_pattern": "^\\d+$"}}"#,
        )
        .unwrap();
        assert!(reg.contains("Graph"));
        assert_eq!(reg.get("Graph").unwrap().arg_pattern.as_deref(), Some("^\\d+$"));
    }
}
