//! Grammar tables for the slide-markdown dialect.
//!
//! Block and inline rules are tried in the order of [`BLOCK_RULES`] and
//! [`INLINE_RULES`]; the first rule that matches wins. All patterns are
//! anchored at the cursor. Constructs the `regex` crate cannot express
//! (matching fences, `\end{env}`, code-span runs) are completed by the
//! tokenizers.

use regex::Regex;
use std::sync::LazyLock;

/// Block-level rules, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRule {
    Newline,
    FencedCode,
    IndentedCode,
    BlockMath,
    LatexEnvironment,
    PluginDefinition,
    SlidocHeader,
    Answer,
    Discuss,
    Tags,
    Hint,
    Notes,
    Extra,
    PluginEmbed,
    Heading,
    Hrule,
    Minirule,
    Pause,
    LinkDefinition,
    BlockQuote,
    ListItem,
    HtmlBlock,
    Paragraph,
}

pub const BLOCK_RULES: &[BlockRule] = &[
    BlockRule::Newline,
    BlockRule::FencedCode,
    BlockRule::IndentedCode,
    BlockRule::BlockMath,
    BlockRule::LatexEnvironment,
    BlockRule::PluginDefinition,
    BlockRule::SlidocHeader,
    BlockRule::Answer,
    BlockRule::Discuss,
    BlockRule::Tags,
    BlockRule::Hint,
    BlockRule::Notes,
    BlockRule::Extra,
    BlockRule::PluginEmbed,
    BlockRule::Heading,
    BlockRule::Hrule,
    BlockRule::Minirule,
    BlockRule::Pause,
    BlockRule::LinkDefinition,
    BlockRule::BlockQuote,
    BlockRule::ListItem,
    BlockRule::HtmlBlock,
    BlockRule::Paragraph,
];

/// Inline rules, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    /// Only tried at the start of a line
    ChoiceMarker,
    BlockMath,
    InlineMath,
    InlineJs,
    InternalRef,
    Link,
    RefLink,
    AutoLink,
    CodeSpan,
    Escape,
    Strong,
    Emphasis,
    Html,
    LineBreak,
    Text,
}

pub const INLINE_RULES: &[InlineRule] = &[
    InlineRule::ChoiceMarker,
    InlineRule::BlockMath,
    InlineRule::InlineMath,
    InlineRule::InlineJs,
    InlineRule::InternalRef,
    InlineRule::Link,
    InlineRule::RefLink,
    InlineRule::AutoLink,
    InlineRule::CodeSpan,
    InlineRule::Escape,
    InlineRule::Strong,
    InlineRule::Emphasis,
    InlineRule::Html,
    InlineRule::LineBreak,
    InlineRule::Text,
];

// === Block patterns ===

/// Blank lines
pub static NEWLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[ \t]*\n)+|^[ \t]+$").unwrap());

/// Opening code fence: fence run and info string
pub static FENCE_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(`{3,}|~{3,})[ \t]*([^\n`]*?)[ \t]*(?:\n|$)").unwrap());

/// Lines indented by four spaces or a tab
pub static INDENTED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?: {4}|\t)[^\n]*(?:\n|$))+").unwrap());

/// `$$ ... $$` on its own
pub static BLOCK_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^ {0,3}\$\$(.*?)\$\$[ \t]*(?:\n+|$)").unwrap());

/// `\begin{env}`; the tokenizer finds the matching `\end{env}`
pub static LATEX_BEGIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}\\begin\{([a-zA-Z]+\*?)\}").unwrap());

/// `<script type="x-slidoc-plugin">Name = { ... }</script>`
pub static PLUGIN_DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)^ {0,3}<script +type="x-slidoc-plugin"[ \t]*>[ \t]*\n?[ \t]*(\w+)[ \t]*=[ \t]*\{(.*?)\n[ \t]*\}[ \t]*</script>[ \t]*(?:\n+|$)"#,
    )
    .unwrap()
});

/// `<!--slidoc-NAME text-->`
pub static SLIDOC_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}<!--slidoc-(\w+)[ \t]*([^\n]*?)[ \t]*-->[ \t]*(?:\n+|$)").unwrap()
});

pub static ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:Answer|Ans):([^\n]*)(?:\n+|$)").unwrap());

pub static DISCUSS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}Discuss:([^\n]*)(?:\n+|$)").unwrap());

pub static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:Tags|Concepts):([^\n]*)(?:\n+|$)").unwrap());

// Block directives stop after the keyword; text on the same line is left
// for the paragraph rule and lands inside the opened block.

/// `Hint:` with an optional percentage penalty
pub static HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}Hint:[ \t]*(?:(\d+(?:\.\d*)?)[ \t]*%)?[ \t]*\n*").unwrap()
});

pub static NOTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}Notes:[ \t]*\n*").unwrap());

pub static EXTRA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}Extra:[ \t]*\n*").unwrap());

/// `=Name(args)` on its own line
pub static PLUGIN_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}=(\w+)\(([^\n]*)\)[ \t]*(?:\n+|$)").unwrap());

/// ATX heading; a closing `#` run is dropped
pub static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+([^\n]*?))?(?:[ \t]+#+)?[ \t]*(?:\n+|$)").unwrap()
});

pub static HRULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ {0,3}(?:(?:-[ \t]*){3,}|(?:\*[ \t]*){3,}|(?:_[ \t]*){3,})(?:\n+|$)").unwrap()
});

pub static MINIRULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}--[ \t]*(?:\n+|$)").unwrap());

pub static PAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:\.\.\.|Pause:)[ \t]*(?:\n+|$)").unwrap());

/// `[key]: url "title"`
pub static LINK_DEFINITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^ {0,3}\[([^\^\]]+)\]:[ \t]*<?([^\s>]+)>?(?:[ \t]+["'(]([^\n]+?)["')])?[ \t]*(?:\n+|$)"#,
    )
    .unwrap()
});

/// Prefix of a block quote line
pub static QUOTE_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}> ?").unwrap());

/// List item marker: bullet or ordinal
pub static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}([*+-]|\d{1,9}[.)])[ \t]+").unwrap());

/// Start of a raw HTML block: a comment or a block-level tag
pub static HTML_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^ {0,3}<(?:!--|/?(?:address|article|aside|audio|blockquote|canvas|center|details",
        r"|div|dl|fieldset|figure|footer|form|h[1-6]|header|hr|iframe|nav|ol|p|pre|script",
        r"|section|style|svg|table|ul|video)(?:[\s/>]|$))"
    ))
    .unwrap()
});

/// A line that ends a paragraph without a blank line
pub static INTERRUPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^ {0,3}(?:",
        r"#{1,6}(?:[ \t]|$)",
        r"|(?:-[ \t]*){3,}$|(?:\*[ \t]*){3,}$|(?:_[ \t]*){3,}$",
        r"|--[ \t]*$",
        r"|`{3,}|~{3,}|\$\$|>",
        r"|(?:Answer|Ans|Tags|Concepts|Discuss|Hint|Notes|Extra):",
        r"|<!--slidoc-",
        r"|(?:[*+-]|\d{1,9}[.)])[ \t]+",
        r"|=\w+\(",
        r")"
    ))
    .unwrap()
});

/// `<!--slidoc-defaults ...-->` as the first non-blank line
pub static DEFAULTS_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<!--slidoc-defaults[ \t]+([^\n]*?)[ \t]*-->").unwrap()
});

/// `Annotation:` lines, removed during preprocessing
pub static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ {0,3}Annotation:[^\n]*(?:\n|$)").unwrap());

// === Inline patterns ===

/// `A..`, `B*..`, `Q..` at the start of a line
pub static CHOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}([a-pA-PqQ])(\*)?\.\.[ \t]+").unwrap());

pub static INLINE_BLOCK_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\$\$(.+?)\$\$").unwrap());

/// `` `$ ... $` ``
pub static INLINE_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^`\$(.+?)\$`").unwrap());

/// `` `=Name.action(arg)` ``
pub static INLINE_JS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^`=(\w+)\.(\w+)\([ \t]*([^)`]*?)[ \t]*\);?`").unwrap()
});

/// `[text]{#key}`
pub static INTERNAL_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[((?:\[[^\^\]]*\]|[^\[\]])*)\][ \t]*\{[ \t]*#([^\^}]*)\}").unwrap()
});

/// `[text](url "title")` and `![alt](src "title")`
pub static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(!?)\[((?:\[[^\]]*\]|[^\[\]])*)\]\([ \t]*<?([^\s)>]*)>?(?:[ \t]+['"]([^\n]*?)['"])?[ \t]*\)"#,
    )
    .unwrap()
});

/// `[text][key]`
pub static REF_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(!?)\[((?:\[[^\]]*\]|[^\[\]])*)\][ \t]*\[([^\]]*)\]").unwrap()
});

pub static AUTOLINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<((?:https?|ftp|mailto):[^>\s]+)>").unwrap());

pub static ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\\([\\`*{}\[\]()#+\-.!_>~|$;])").unwrap());

pub static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(?:\*\*(.+?)\*\*|__(.+?)__)").unwrap());

pub static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:\*((?:\*\*|[^*])+?)\*|_((?:__|[^_])+?)_\b)").unwrap()
});

pub static INLINE_HTML_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(?:<!--.*?-->|</?[A-Za-z][\w-]*(?:\s+[^<>]*)?/?>)").unwrap()
});

pub static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {2,}\n").unwrap());

/// Characters that may start a non-text inline token
pub const INLINE_SPECIAL: &[char] = &['\\', '<', '!', '[', '_', '*', '`', '$'];

// === Answer patterns ===

/// `type=value`
pub static TYPED_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([a-zA-Z][\w/-]*)[ \t]*=[ \t]*(.*)$").unwrap());

/// `value`, `value +/- error`, `value error`, optional `%` on the error
pub static NUMBER_ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)",
        r"(?:[ \t]*(?:\+/-|[ \t])[ \t]*((?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)(%)?)?$"
    ))
    .unwrap()
});

/// `=Name.action(arg)`
pub static PLUGIN_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=(\w+)\.(\w+)\([ \t]*(.*?)[ \t]*\)$").unwrap());

/// `Name/arg` or bare `Name`
pub static PLUGIN_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(?:/(.*))?$").unwrap());

/// Choice letters
pub static CHOICE_LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Pa-p]+$").unwrap());

/// `{{field}}` in plugin templates
pub static TEMPLATE_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[ \t]*(\w*)[ \t]*\}\}").unwrap());

// === Identifier patterns ===

/// Runs of characters not allowed in ids
pub static ID_DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^-\w.]+").unwrap());

/// `{#id}` attribute at the end of a heading
pub static HEADING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\{[ \t]*#([^}\s]+)[ \t]*\}[ \t]*$").unwrap());
