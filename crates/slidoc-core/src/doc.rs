//! Rendered document tree.
//!
//! The renderer cannot know the label of a reference defined later in the
//! file, so it leaves a [`Fragment::Pending`] node in its place. Once the
//! whole file is rendered, [`Document::resolve`] walks the tree and fills
//! every pending node with the final label, or with a visible `(id)??`
//! marker when the reference was never defined.

use serde::Serialize;

/// A piece of slide output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Fragment {
    Html(String),
    /// Label of the reference with this id, not yet known
    Pending(String),
}

/// Output of one slide
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlideHtml {
    pub number: usize,
    pub id: String,
    pub fragments: Vec<Fragment>,
}

impl SlideHtml {
    pub fn new(number: usize, id: impl Into<String>) -> Self {
        Self {
            number,
            id: id.into(),
            fragments: Vec::new(),
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Pending(id) => Some(id.as_str()),
            Fragment::Html(_) => None,
        })
    }
}

/// Rendered slides of one file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub chapter_id: String,
    /// Plugin `head` templates, once each
    pub head: Vec<String>,
    pub slides: Vec<SlideHtml>,
    /// Emit `<hr>` between slides
    pub rules: bool,
}

impl Document {
    /// Ids still pending anywhere in the document
    pub fn pending(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.slides.iter().flat_map(SlideHtml::pending).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Replace every pending node using `label`
    pub fn resolve<F>(&mut self, label: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for slide in &mut self.slides {
            for fragment in &mut slide.fragments {
                if let Fragment::Pending(id) = fragment {
                    let text = label(id).unwrap_or_else(|| format!("({id})??"));
                    *fragment = Fragment::Html(text);
                }
            }
        }
    }

    /// Final HTML. Pending nodes left unresolved render as `(id)??`.
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "<div id=\"{}\" class=\"slidoc-container\">\n",
            self.chapter_id
        );
        for (i, slide) in self.slides.iter().enumerate() {
            if i > 0 && self.rules {
                out.push_str("<hr class=\"slidoc-noslide\">\n");
            }
            out.push_str(&format!(
                "<div id=\"{}\" class=\"slidoc-slide {}-slide\">\n",
                slide.id, self.chapter_id
            ));
            for fragment in &slide.fragments {
                match fragment {
                    Fragment::Html(html) => out.push_str(html),
                    Fragment::Pending(id) => out.push_str(&format!("({id})??")),
                }
            }
            out.push_str("</div>\n");
        }
        out.push_str("</div>\n");
        out
    }
}
