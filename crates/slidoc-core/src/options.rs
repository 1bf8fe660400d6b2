//! Compile options and per-file defaults.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Content that can be left out of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strip {
    /// Do not render answers
    Answers,
    /// Do not prefix chapter headers with the file number
    Chapters,
    /// Do not render `Tags:` lines
    Concepts,
    /// Drop hidden blocks
    Hidden,
    /// Drop notes blocks
    Notes,
    /// Do not render the slide-separating rule
    Rule,
    /// Do not number section headers
    Sections,
}

/// Optional dialect features
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Alternative choices (`A*..`)
    Multiplicity,
    /// Skip concept coverage warnings
    Assessment,
}

impl Feature {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiplicity" => Some(Feature::Multiplicity),
            "assessment" => Some(Feature::Assessment),
            _ => None,
        }
    }
}

/// Options for a compile run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Regex of level-2/3 headers that open a hidden block
    pub hide: Option<String>,
    pub strip: BTreeSet<Strip>,
    /// Number untitled slides
    pub number: bool,
    /// Prefix for links into the index pages
    pub site_url: String,
    pub index_file: String,
    pub qindex_file: String,
    /// Contents page listing every file of the run
    pub toc_file: String,
    /// Concept cross-reference and sub-question page
    pub crossref_file: String,
    pub features: BTreeSet<Feature>,
    /// Inline resolved images as `data:` URLs
    pub embed_images: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            hide: None,
            strip: BTreeSet::new(),
            number: false,
            site_url: String::new(),
            index_file: "ind.html".to_string(),
            qindex_file: "qind.html".to_string(),
            toc_file: "toc.html".to_string(),
            crossref_file: "xref.html".to_string(),
            features: BTreeSet::new(),
            embed_images: false,
        }
    }
}

impl CompileOptions {
    pub fn strips(&self, what: Strip) -> bool {
        self.strip.contains(&what)
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Options with a file's defaults header applied
    pub fn with_defaults(&self, defaults: &FileDefaults) -> Self {
        let mut merged = self.clone();
        if let Some(features) = &defaults.features {
            merged.features = features.clone();
        }
        if let Some(hide) = &defaults.hide {
            merged.hide = Some(hide.clone());
        }
        if let Some(number) = defaults.number {
            merged.number = number;
        }
        merged
    }
}

/// Overrides from a leading `<!--slidoc-defaults --key=value ...-->` header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDefaults {
    pub features: Option<BTreeSet<Feature>>,
    pub hide: Option<String>,
    pub number: Option<bool>,
    /// Keys that were not recognized
    pub unknown: Vec<String>,
}

impl FileDefaults {
    pub fn parse(text: &str) -> Self {
        let mut defaults = FileDefaults::default();
        for arg in text.split_whitespace() {
            let Some(arg) = arg.strip_prefix("--") else {
                defaults.unknown.push(arg.to_string());
                continue;
            };
            let (key, value) = match arg.split_once('=') {
                Some((k, v)) => (k, Some(v.trim_matches(|c| c == '"' || c == '\''))),
                None => (arg, None),
            };
            match key {
                "features" => {
                    let mut set = BTreeSet::new();
                    for name in value.unwrap_or_default().split(',').filter(|s| !s.is_empty()) {
                        match Feature::parse(name) {
                            Some(f) => {
                                set.insert(f);
                            }
                            None => defaults.unknown.push(format!("features={name}")),
                        }
                    }
                    defaults.features = Some(set);
                }
                "hide" => defaults.hide = value.map(String::from),
                "number" => {
                    defaults.number = Some(!matches!(value, Some("no" | "false" | "0")));
                }
                _ => defaults.unknown.push(key.to_string()),
            }
        }
        defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_header() {
        let d = FileDefaults::parse("--features=multiplicity,assessment --hide=Answer --number");
        assert_eq!(
            d.features,
            Some(BTreeSet::from([Feature::Multiplicity, Feature::Assessment]))
        );
        assert_eq!(d.hide.as_deref(), Some("Answer"));
        assert_eq!(d.number, Some(true));
        assert!(d.unknown.is_empty());

        let merged = CompileOptions::default().with_defaults(&d);
        assert!(merged.has(Feature::Multiplicity));
        assert!(merged.number);
    }

    #[test]
    fn test_defaults_unknown_keys() {
        let d = FileDefaults::parse("--pace=1 --features=bogus");
        assert_eq!(d.unknown, vec!["pace", "features=bogus"]);
        assert_eq!(d.features, Some(BTreeSet::new()));
    }

    #[test]
    fn test_options_from_json() {
        let opts: CompileOptions =
            serde_json::from_str(r#"{"strip": ["notes", "rule"], "number": true}"#).unwrap();
        assert!(opts.strips(Strip::Notes));
        assert!(opts.strips(Strip::Rule));
        assert!(!opts.strips(Strip::Hidden));
        assert_eq!(opts.index_file, "ind.html");
    }
}
