//! Block tokenizer.
//!
//! Turns preprocessed source into a [`TokenStream`]. Slide boundaries are
//! tracked here too, from the raw text alone, so that digests and slide
//! slices never depend on how the renderer interprets tokens.

use std::collections::HashMap;

use regex::{Captures, Regex};

use crate::error::{CompileError, Result};
use crate::grammar::*;
use crate::refs::ref_key;
use crate::token::{LinkDef, RawSlice, Token, TokenStream};

/// Tokenize a whole (preprocessed) file
pub fn tokenize(source: &str) -> Result<TokenStream> {
    let mut lexer = BlockLexer::default();
    lexer.lex(source, 0)?;
    lexer.slices.push(RawSlice {
        start: lexer.slice_start,
        end: source.len(),
    });
    tracing::trace!(
        tokens = lexer.tokens.len(),
        slides = lexer.slices.len(),
        "tokenized"
    );
    Ok(TokenStream {
        tokens: lexer.tokens,
        slices: lexer.slices,
        link_defs: lexer.link_defs,
    })
}

#[derive(Default)]
struct BlockLexer {
    tokens: Vec<Token>,
    slices: Vec<RawSlice>,
    link_defs: HashMap<String, LinkDef>,
    /// Nesting depth; only depth 0 touches the slice log
    depth: usize,
    slice_start: usize,
    slide_has_content: bool,
}

enum Matched {
    Token(usize, Token),
    Skip(usize),
    Quote(usize, String),
    LinkDef(usize, String, LinkDef),
}

impl Matched {
    fn len(&self) -> usize {
        match self {
            Matched::Token(len, _)
            | Matched::Skip(len)
            | Matched::Quote(len, _)
            | Matched::LinkDef(len, _, _) => *len,
        }
    }
}

impl BlockLexer {
    /// `base` is the offset of `text` in the source (exact at depth 0)
    fn lex(&mut self, text: &str, base: usize) -> Result<()> {
        let mut pos = 0;
        while pos < text.len() {
            let rest = &text[pos..];
            let matched = BLOCK_RULES
                .iter()
                .find_map(|rule| match_rule(*rule, rest).filter(|m| m.len() > 0))
                .ok_or(CompileError::NoRuleMatched { offset: base + pos })?;

            let start = base + pos;
            let len = matched.len();
            match matched {
                Matched::Skip(_) => {}
                Matched::Token(_, token) => self.emit(token, start, start + len),
                Matched::LinkDef(_, key, def) => {
                    self.link_defs.entry(key).or_insert(def);
                }
                Matched::Quote(_, inner) => {
                    self.emit(Token::QuoteStart, start, start);
                    self.depth += 1;
                    let nested = self.lex(&inner, start);
                    self.depth -= 1;
                    nested?;
                    self.emit(Token::QuoteEnd, start + len, start + len);
                }
            }
            pos += len;
        }
        Ok(())
    }

    fn emit(&mut self, token: Token, start: usize, end: usize) {
        if self.depth > 0 {
            self.tokens.push(token);
            return;
        }
        if token.starts_slide() && self.slide_has_content {
            self.flush_slice(start);
        }
        let ends = token.ends_slide();
        self.slide_has_content |= token.is_content();
        self.tokens.push(token);
        if ends {
            self.flush_slice(end);
        }
    }

    fn flush_slice(&mut self, at: usize) {
        self.slices.push(RawSlice {
            start: self.slice_start,
            end: at,
        });
        self.slice_start = at;
        self.slide_has_content = false;
    }
}

fn captured(re: &Regex, rest: &str, build: fn(&Captures) -> Token) -> Option<Matched> {
    re.captures(rest)
        .map(|c| Matched::Token(c[0].len(), build(&c)))
}

fn match_rule(rule: BlockRule, rest: &str) -> Option<Matched> {
    match rule {
        BlockRule::Newline => NEWLINE_RE.find(rest).map(|m| Matched::Skip(m.end())),
        BlockRule::FencedCode => fenced_code(rest),
        BlockRule::IndentedCode => INDENTED_CODE_RE.find(rest).map(|m| {
            Matched::Token(
                m.end(),
                Token::BlockCode {
                    lang: None,
                    code: outdent(m.as_str()),
                },
            )
        }),
        BlockRule::BlockMath => captured(&BLOCK_MATH_RE, rest, |c| Token::BlockMath {
            text: c[1].to_string(),
        }),
        BlockRule::LatexEnvironment => latex_environment(rest),
        BlockRule::PluginDefinition => captured(&PLUGIN_DEFINITION_RE, rest, |c| {
            Token::PluginDefinition {
                name: c[1].to_string(),
                text: c[2].to_string(),
            }
        }),
        BlockRule::SlidocHeader => captured(&SLIDOC_HEADER_RE, rest, |c| Token::SlidocHeader {
            name: c[1].to_string(),
            text: c[2].to_string(),
        }),
        BlockRule::Answer => captured(&ANSWER_RE, rest, |c| Token::Answer {
            text: c[1].trim().to_string(),
        }),
        BlockRule::Discuss => captured(&DISCUSS_RE, rest, |c| Token::Discuss {
            text: c[1].trim().to_string(),
        }),
        BlockRule::Tags => captured(&TAGS_RE, rest, |c| Token::Tags {
            text: c[1].trim().to_string(),
        }),
        BlockRule::Hint => captured(&HINT_RE, rest, |c| Token::Hint {
            penalty: c.get(1).and_then(|m| m.as_str().parse().ok()),
        }),
        BlockRule::Notes => captured(&NOTES_RE, rest, |_| Token::Notes),
        BlockRule::Extra => captured(&EXTRA_RE, rest, |_| Token::Extra),
        BlockRule::PluginEmbed => captured(&PLUGIN_EMBED_RE, rest, |c| Token::PluginEmbed {
            name: c[1].to_string(),
            args: c[2].trim().to_string(),
        }),
        BlockRule::Heading => captured(&HEADING_RE, rest, |c| Token::Heading {
            level: c[1].len() as u8,
            text: c.get(2).map_or("", |m| m.as_str()).trim().to_string(),
        }),
        BlockRule::Hrule => captured(&HRULE_RE, rest, |_| Token::Hrule),
        BlockRule::Minirule => captured(&MINIRULE_RE, rest, |_| Token::Minirule),
        BlockRule::Pause => captured(&PAUSE_RE, rest, |_| Token::Pause),
        BlockRule::LinkDefinition => LINK_DEFINITION_RE.captures(rest).map(|c| {
            Matched::LinkDef(
                c[0].len(),
                ref_key(&c[1]),
                LinkDef {
                    url: c[2].to_string(),
                    title: c.get(3).map(|m| m.as_str().to_string()),
                },
            )
        }),
        BlockRule::BlockQuote => block_quote(rest),
        BlockRule::ListItem => list_item(rest),
        BlockRule::HtmlBlock => html_block(rest),
        BlockRule::Paragraph => paragraph(rest),
    }
}

fn fenced_code(rest: &str) -> Option<Matched> {
    let caps = FENCE_OPEN_RE.captures(rest)?;
    let fence = caps.get(1)?.as_str();
    let fence_char = fence.chars().next()?;
    let lang = caps
        .get(2)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(String::from);

    let body_start = caps.get(0)?.end();
    let mut offset = body_start;
    let mut code_end = rest.len();
    let mut end = rest.len();
    for line in rest[body_start..].split_inclusive('\n') {
        if is_closing_fence(line, fence_char, fence.len()) {
            code_end = offset;
            end = offset + line.len();
            break;
        }
        offset += line.len();
    }

    let code = rest[body_start..code_end].trim_end_matches('\n').to_string();
    Some(Matched::Token(end, Token::BlockCode { lang, code }))
}

fn is_closing_fence(line: &str, fence_char: char, min_len: usize) -> bool {
    let line = line.trim_end_matches('\n');
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let run = trimmed.chars().take_while(|c| *c == fence_char).count();
    run >= min_len && trimmed[run..].trim().is_empty()
}

/// Strip one level of code indentation from every line
fn outdent(block: &str) -> String {
    block
        .lines()
        .map(|line| {
            line.strip_prefix("    ")
                .or_else(|| line.strip_prefix('\t'))
                .unwrap_or(line.trim_start())
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim_end_matches('\n')
        .to_string()
}

fn latex_environment(rest: &str) -> Option<Matched> {
    let caps = LATEX_BEGIN_RE.captures(rest)?;
    let end_marker = format!("\\end{{{}}}", &caps[1]);
    let body_start = caps.get(0)?.end();
    let env_end = body_start + rest[body_start..].find(&end_marker)? + end_marker.len();

    let tail = &rest[env_end..];
    let spaces = tail.len() - tail.trim_start_matches([' ', '\t']).len();
    let blank = NEWLINE_RE
        .find(&tail[spaces..])
        .map_or(0, |m| m.end());

    Some(Matched::Token(
        env_end + spaces + blank,
        Token::LatexEnvironment {
            name: caps[1].to_string(),
            text: rest[..env_end].trim_start().to_string(),
        },
    ))
}

fn block_quote(rest: &str) -> Option<Matched> {
    if !QUOTE_PREFIX_RE.is_match(rest) {
        return None;
    }
    let mut inner = String::new();
    let mut consumed = 0;
    let mut last_blank = false;
    for line in rest.split_inclusive('\n') {
        let body = line.trim_end_matches('\n');
        if let Some(m) = QUOTE_PREFIX_RE.find(body) {
            let content = &body[m.end()..];
            last_blank = content.trim().is_empty();
            inner.push_str(content);
        } else if !last_blank && !body.trim().is_empty() && !INTERRUPT_RE.is_match(body) {
            // lazy continuation of a quoted paragraph
            inner.push_str(body);
        } else {
            break;
        }
        inner.push('\n');
        consumed += line.len();
    }
    Some(Matched::Quote(consumed, inner))
}

fn list_item(rest: &str) -> Option<Matched> {
    let caps = LIST_MARKER_RE.captures(rest)?;
    let ordered = caps[1].starts_with(|c: char| c.is_ascii_digit());
    let marker_end = caps.get(0)?.end();
    let first_end = rest[marker_end..]
        .find('\n')
        .map_or(rest.len(), |i| marker_end + i + 1);

    let mut text = rest[marker_end..first_end].trim_end().to_string();
    let mut consumed = first_end;
    for line in rest[first_end..].split_inclusive('\n') {
        let body = line.trim_end_matches('\n');
        if body.trim().is_empty() || LIST_MARKER_RE.is_match(body) || INTERRUPT_RE.is_match(body)
        {
            break;
        }
        text.push('\n');
        text.push_str(body.trim());
        consumed += line.len();
    }
    Some(Matched::Token(consumed, Token::ListItem { ordered, text }))
}

fn html_block(rest: &str) -> Option<Matched> {
    if !HTML_BLOCK_RE.is_match(rest) {
        return None;
    }
    let consumed: usize = rest
        .split_inclusive('\n')
        .take_while(|line| !line.trim().is_empty())
        .map(str::len)
        .sum();
    Some(Matched::Token(
        consumed,
        Token::Html {
            text: rest[..consumed].trim_end().to_string(),
        },
    ))
}

fn paragraph(rest: &str) -> Option<Matched> {
    let mut consumed = 0;
    for (i, line) in rest.split_inclusive('\n').enumerate() {
        let body = line.trim_end_matches('\n');
        if i > 0 && (body.trim().is_empty() || INTERRUPT_RE.is_match(body)) {
            break;
        }
        consumed += line.len();
    }
    if consumed == 0 {
        return None;
    }
    Some(Matched::Token(
        consumed,
        Token::Text {
            text: rest[..consumed].trim().to_string(),
        },
    ))
}
