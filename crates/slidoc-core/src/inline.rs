//! Inline tokenizer.

use regex::Captures;

use crate::grammar::*;
use crate::token::InlineToken;

/// Tokenize the text of one block token. Never fails: unmatched input
/// falls through to the text rule.
pub fn tokenize_inline(text: &str) -> Vec<InlineToken> {
    let mut tokens: Vec<InlineToken> = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        let at_line_start = pos == 0 || text[..pos].ends_with('\n');
        let (len, token) = INLINE_RULES
            .iter()
            .find_map(|rule| match_inline(*rule, rest, at_line_start))
            .unwrap_or_else(|| text_run(rest));

        match (tokens.last_mut(), token) {
            (Some(InlineToken::Text(prev)), InlineToken::Text(more)) => prev.push_str(&more),
            (_, token) => tokens.push(token),
        }
        pos += len;
    }
    tokens
}

fn group(c: &Captures, i: usize) -> String {
    c.get(i).map_or(String::new(), |m| m.as_str().to_string())
}

fn match_inline(rule: InlineRule, rest: &str, at_line_start: bool) -> Option<(usize, InlineToken)> {
    let (len, token) = match rule {
        InlineRule::ChoiceMarker => {
            if !at_line_start {
                return None;
            }
            let c = CHOICE_RE.captures(rest)?;
            let letter = c[1].chars().next()?.to_ascii_uppercase();
            (
                c[0].len(),
                InlineToken::ChoiceMarker {
                    letter,
                    alternative: c.get(2).is_some(),
                },
            )
        }
        InlineRule::BlockMath => {
            let c = INLINE_BLOCK_MATH_RE.captures(rest)?;
            (c[0].len(), InlineToken::BlockMath(group(&c, 1)))
        }
        InlineRule::InlineMath => {
            let c = INLINE_MATH_RE.captures(rest)?;
            (c[0].len(), InlineToken::InlineMath(group(&c, 1)))
        }
        InlineRule::InlineJs => {
            let c = INLINE_JS_RE.captures(rest)?;
            (
                c[0].len(),
                InlineToken::InlineJs {
                    plugin: group(&c, 1),
                    action: group(&c, 2),
                    arg: group(&c, 3),
                },
            )
        }
        InlineRule::InternalRef => {
            let c = INTERNAL_REF_RE.captures(rest)?;
            (
                c[0].len(),
                InlineToken::InternalRef {
                    text: group(&c, 1),
                    key: c[2].trim().to_string(),
                },
            )
        }
        InlineRule::Link => {
            let c = LINK_RE.captures(rest)?;
            (
                c[0].len(),
                InlineToken::Link {
                    image: !c[1].is_empty(),
                    text: group(&c, 2),
                    url: group(&c, 3),
                    title: c.get(4).map(|m| m.as_str().to_string()),
                },
            )
        }
        InlineRule::RefLink => {
            let c = REF_LINK_RE.captures(rest)?;
            let key = if c[3].trim().is_empty() { group(&c, 2) } else { group(&c, 3) };
            (
                c[0].len(),
                InlineToken::RefLink {
                    image: !c[1].is_empty(),
                    text: group(&c, 2),
                    key,
                },
            )
        }
        InlineRule::AutoLink => {
            let c = AUTOLINK_RE.captures(rest)?;
            (c[0].len(), InlineToken::AutoLink(group(&c, 1)))
        }
        InlineRule::CodeSpan => code_span(rest)?,
        InlineRule::Escape => {
            let c = ESCAPE_RE.captures(rest)?;
            (c[0].len(), InlineToken::Escape(c[1].chars().next()?))
        }
        InlineRule::Strong => {
            let c = STRONG_RE.captures(rest)?;
            let inner = c.get(1).or_else(|| c.get(2))?;
            (c[0].len(), InlineToken::Strong(inner.as_str().to_string()))
        }
        InlineRule::Emphasis => {
            let c = EMPHASIS_RE.captures(rest)?;
            let inner = c.get(1).or_else(|| c.get(2))?;
            (c[0].len(), InlineToken::Emphasis(inner.as_str().to_string()))
        }
        InlineRule::Html => {
            let m = INLINE_HTML_RE.find(rest)?;
            (m.end(), InlineToken::Html(m.as_str().to_string()))
        }
        InlineRule::LineBreak => (LINE_BREAK_RE.find(rest)?.end(), InlineToken::LineBreak),
        InlineRule::Text => text_run(rest),
    };
    Some((len, token))
}

/// A code span closed by a backtick run of the same length
fn code_span(rest: &str) -> Option<(usize, InlineToken)> {
    let n = rest.bytes().take_while(|b| *b == b'`').count();
    if n == 0 {
        return None;
    }
    let body = &rest[n..];
    let mut i = 0;
    while let Some(found) = body[i..].find('`') {
        let start = i + found;
        let run = body[start..].bytes().take_while(|b| *b == b'`').count();
        if run == n {
            let code = body[..start].trim().to_string();
            return Some((n + start + run, InlineToken::Code(code)));
        }
        i = start + run;
    }
    None
}

/// Plain text up to the next character that could start another token.
/// Always consumes at least one character and stops after a newline, so
/// choice markers are tried at every line start.
fn text_run(rest: &str) -> (usize, InlineToken) {
    let mut end = rest.len();
    for (i, c) in rest.char_indices() {
        if c == '\n' {
            end = i + 1;
            break;
        }
        if i == 0 {
            continue;
        }
        if INLINE_SPECIAL.contains(&c) || (c == ' ' && LINE_BREAK_RE.is_match(&rest[i..])) {
            end = i;
            break;
        }
    }
    (end, InlineToken::Text(rest[..end].to_string()))
}
