//! Inline rendering: links, internal references, images and plugin calls.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::Renderer;
use super::html::{escape, escape_attr, image_mime};
use crate::concepts::{INDEX_ID, concept_anchor};
use crate::diagnostics::WarningKind;
use crate::doc::Fragment;
use crate::error::Result;
use crate::inline::tokenize_inline;
use crate::model::RefKind;
use crate::plugin::ImageContext;
use crate::refs::{RefDecl, ref_id, ref_key};
use crate::token::InlineToken;

/// Appends html to a fragment list, merging adjacent text
fn push(out: &mut Vec<Fragment>, html: &str) {
    match out.last_mut() {
        Some(Fragment::Html(prev)) => prev.push_str(html),
        _ => out.push(Fragment::Html(html.to_string())),
    }
}

fn is_remote(url: &str) -> bool {
    url.contains("://") || url.starts_with("data:") || url.starts_with("//")
}

impl Renderer<'_> {
    pub(super) fn inline(&mut self, tokens: Vec<InlineToken>) -> Result<Vec<Fragment>> {
        let mut out = Vec::new();
        for token in tokens {
            match token {
                InlineToken::Text(text) => push(&mut out, &escape(&text)),
                InlineToken::ChoiceMarker { letter, alternative } => {
                    let star = if alternative { "*" } else { "" };
                    push(&mut out, &format!("{letter}{star}.. "));
                }
                InlineToken::BlockMath(math) => push(
                    &mut out,
                    &format!("<span class=\"slidoc-block-math\">$${}$$</span>", escape(&math)),
                ),
                InlineToken::InlineMath(math) => push(
                    &mut out,
                    &format!(
                        "<span class=\"slidoc-inline-math\">\\({}\\)</span>",
                        escape(&math)
                    ),
                ),
                InlineToken::InlineJs {
                    plugin,
                    action,
                    arg,
                } => {
                    push(
                        &mut out,
                        &format!(
                            "<code class=\"slidoc-inline-js\" data-slidoc-js-function=\"{}.{}\" data-slidoc-js-argument=\"{}\">{}</code>",
                            escape_attr(&plugin),
                            escape_attr(&action),
                            escape_attr(&arg),
                            escape(&arg)
                        ),
                    );
                    self.slide.inline_plugins.push(plugin);
                }
                InlineToken::InternalRef { text, key } => self.internal_ref(&mut out, &text, &key)?,
                InlineToken::Link {
                    text,
                    url,
                    title,
                    image: true,
                } => self.image(&mut out, &text, &url, title.as_deref()),
                InlineToken::Link {
                    text,
                    url,
                    title,
                    image: false,
                } => self.link(&mut out, &text, &url, title.as_deref()),
                InlineToken::RefLink { text, key, image } => {
                    let def = self.stream.link_defs.get(&ref_key(&key)).cloned();
                    match def {
                        Some(def) if image => {
                            self.image(&mut out, &text, &def.url, def.title.as_deref())
                        }
                        Some(def) => self.link(&mut out, &text, &def.url, def.title.as_deref()),
                        None => {
                            let bang = if image { "!" } else { "" };
                            push(&mut out, &escape(&format!("{bang}[{text}][{key}]")));
                        }
                    }
                }
                InlineToken::AutoLink(url) => push(
                    &mut out,
                    &format!("<a href=\"{}\">{}</a>", escape_attr(&url), escape(&url)),
                ),
                InlineToken::Code(code) => {
                    push(&mut out, &format!("<code>{}</code>", escape(&code)))
                }
                InlineToken::Escape(c) => push(&mut out, &escape(&c.to_string())),
                InlineToken::Strong(inner) => {
                    push(&mut out, "<strong>");
                    let body = self.inline(tokenize_inline(&inner))?;
                    out.extend(body);
                    push(&mut out, "</strong>");
                }
                InlineToken::Emphasis(inner) => {
                    push(&mut out, "<em>");
                    let body = self.inline(tokenize_inline(&inner))?;
                    out.extend(body);
                    push(&mut out, "</em>");
                }
                InlineToken::Html(html) => push(&mut out, &html),
                InlineToken::LineBreak => push(&mut out, "<br>\n"),
            }
        }
        Ok(out)
    }

    /// `[text]{#key}` defines a reference here
    fn internal_ref(&mut self, out: &mut Vec<Fragment>, text: &str, key: &str) -> Result<()> {
        let decl = RefDecl::parse(key, text);
        let defined = self.define_ref(&decl.id(), decl.kind, &ref_key(text))?;
        let kind = match decl.kind {
            RefKind::Plain => "plain",
            RefKind::Counted => "counted",
            RefKind::ChapterCounted => "chapter",
        };
        let label = match defined.label() {
            "" => String::new(),
            label if text.is_empty() => escape(label),
            label => format!(" {}", escape(label)),
        };
        push(
            out,
            &format!(
                "<span id=\"{}\" class=\"slidoc-ref slidoc-ref-{kind}\">{}{label}</span>",
                defined.rendered_id(),
                escape(text)
            ),
        );
        Ok(())
    }

    fn link(&mut self, out: &mut Vec<Fragment>, text: &str, url: &str, title: Option<&str>) {
        let opts = self.ctx.options;
        if let Some(tag) = url.strip_prefix("##") {
            let tag = if tag.is_empty() { text } else { tag };
            push(
                out,
                &format!(
                    "<a class=\"slidoc-concept-link\" href=\"{}{}#{}\" target=\"_blank\">{}</a>",
                    opts.site_url,
                    opts.index_file,
                    concept_anchor(INDEX_ID, tag),
                    escape(text)
                ),
            );
            return;
        }

        if let Some(key) = url.strip_prefix("#:") {
            let id = ref_id(if key.is_empty() { text } else { key });
            push(
                out,
                &format!("<a class=\"slidoc-ref-link\" href=\"#{id}\">{}", escape(text)),
            );
            if !text.is_empty() {
                push(out, " ");
            }
            match self.file.refs.get(&id) {
                Some(reference) => push(out, &escape(&reference.label)),
                None => {
                    self.file.forward.add(id.clone(), self.slide.number);
                    out.push(Fragment::Pending(id));
                }
            }
            push(out, "</a>");
            return;
        }

        if let Some(key) = url.strip_prefix('#') {
            let id = ref_id(if key.is_empty() { text } else { key });
            if !self.file.refs.contains(&id) {
                self.file.forward.add(id.clone(), self.slide.number);
            }
            push(
                out,
                &format!(
                    "<span class=\"slidoc-clickable slidoc-goto\" data-slidoc-goto=\"#{id}\">{}</span>",
                    escape(text)
                ),
            );
            return;
        }

        let title = title.map_or(String::new(), |t| format!(" title=\"{}\"", escape_attr(t)));
        push(
            out,
            &format!(
                "<a href=\"{}\"{title}>{}</a>",
                escape_attr(url),
                escape(text)
            ),
        );
    }

    fn image(&mut self, out: &mut Vec<Fragment>, alt: &str, url: &str, title: Option<&str>) {
        let mut src = url.to_string();
        if !is_remote(url) {
            if !self.slide.images.iter().any(|p| p == url) {
                self.slide.images.push(url.to_string());
            }
            if self.ctx.options.embed_images {
                let context = ImageContext {
                    file: self.ctx.file,
                    slide_id: &self.slide.id,
                };
                match self.ctx.images.and_then(|r| r.resolve(url, context)) {
                    Some(bytes) => {
                        src = format!("data:{};base64,{}", image_mime(url), STANDARD.encode(bytes));
                    }
                    None => self.warn(WarningKind::ImageNotFound {
                        path: url.to_string(),
                    }),
                }
            }
        }
        let title = title.map_or(String::new(), |t| format!(" title=\"{}\"", escape_attr(t)));
        push(
            out,
            &format!(
                "<img src=\"{}\" alt=\"{}\"{title}>",
                escape_attr(&src),
                escape_attr(alt)
            ),
        );
    }
}
