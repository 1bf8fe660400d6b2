//! `Answer:` directive parsing.
//!
//! ```text
//! Answer: 3.5 +/- 0.2; weight=2,1 retry=2,30
//! Answer: choice=B
//! Answer: =Graph.expect(2)
//! ```
//!
//! The text before the first unescaped `;` is the answer itself; the rest
//! is a list of shell-style `name=value` options.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::SyntaxError;
use crate::grammar::{
    CHOICE_LETTERS_RE, NUMBER_ANSWER_RE, PLUGIN_ANSWER_RE, PLUGIN_TYPE_RE, TYPED_ANSWER_RE,
};
use crate::model::{CorrectSpec, Explain, QType, QuestionOptions, Retry, Share, Team, Vote};
use crate::plugin::PluginRegistry;

/// A parsed `Answer:` line
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSpec {
    /// Type established by the answer, if any
    pub qtype: Option<QType>,
    pub correct: Option<CorrectSpec>,
    /// Plugin the slide must embed
    pub required_plugin: Option<String>,
    pub options: AnswerOptions,
}

/// Options after the `;`
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOptions {
    pub weight: f64,
    pub gweight: Option<f64>,
    pub vweight: f64,
    pub retry: Option<Retry>,
    pub question: QuestionOptions,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            weight: 1.0,
            gweight: None,
            vweight: 0.0,
            retry: None,
            question: QuestionOptions::default(),
        }
    }
}

/// Parse an answer directive. `has_choices` tells whether the slide
/// presented choice markers before the answer.
pub fn parse_answer(
    text: &str,
    has_choices: bool,
    plugins: &PluginRegistry,
) -> Result<AnswerSpec, SyntaxError> {
    let (spec, option_text) = split_unescaped(text);
    let spec = spec.trim().replace("\\;", ";");
    let options = parse_options(option_text.unwrap_or(""))?;

    let mut answer = resolve_spec(&spec, has_choices, plugins)?;
    answer.options = options;
    Ok(answer)
}

/// Split on the first `;` not preceded by a backslash
fn split_unescaped(text: &str) -> (&str, Option<&str>) {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            ';' if !escaped => return (&text[..i], Some(&text[i + 1..])),
            _ => escaped = false,
        }
    }
    (text, None)
}

fn invalid(text: &str, reason: impl Into<String>) -> SyntaxError {
    SyntaxError::InvalidAnswer {
        text: text.to_string(),
        reason: reason.into(),
    }
}

fn answer(qtype: Option<QType>, correct: Option<CorrectSpec>) -> AnswerSpec {
    AnswerSpec {
        qtype,
        correct,
        required_plugin: None,
        options: AnswerOptions::default(),
    }
}

fn resolve_spec(
    spec: &str,
    has_choices: bool,
    plugins: &PluginRegistry,
) -> Result<AnswerSpec, SyntaxError> {
    if spec.is_empty() {
        return Ok(answer(None, None));
    }

    // plugin response binding
    if let Some(c) = PLUGIN_ANSWER_RE.captures(spec) {
        let (name, action, arg) = (&c[1], &c[2], &c[3]);
        if let Some(pattern) = plugins.get(name).and_then(|d| d.arg_pattern.as_deref()) {
            check_arg_pattern(spec, pattern, arg)?;
        }
        return Ok(AnswerSpec {
            qtype: Some(QType::Plugin {
                name: name.to_string(),
                args: String::new(),
            }),
            correct: Some(CorrectSpec::Plugin {
                name: name.to_string(),
                action: action.to_string(),
                arg: arg.to_string(),
            }),
            required_plugin: Some(name.to_string()),
            options: AnswerOptions::default(),
        });
    }

    // type=value
    if let Some(c) = TYPED_ANSWER_RE.captures(spec) {
        let (keyword, value) = (&c[1], c[2].trim());
        if let Some(qtype) = QType::from_keyword(keyword) {
            let correct = typed_value(spec, &qtype, value)?;
            return Ok(answer(Some(qtype), correct));
        }
        if plugins.contains(keyword) {
            let mut spec = answer(
                Some(QType::Plugin {
                    name: keyword.to_string(),
                    args: String::new(),
                }),
                (!value.is_empty()).then(|| CorrectSpec::Literal {
                    value: value.to_string(),
                }),
            );
            spec.required_plugin = Some(keyword.to_string());
            return Ok(spec);
        }
        // not a type: the whole spec is a literal answer
    }

    if let Some(correct) = parse_number(spec)? {
        return Ok(answer(Some(QType::Number), Some(correct)));
    }

    if let Some(qtype) = QType::from_keyword(spec) {
        return Ok(answer(Some(qtype), None));
    }

    // Name/arg against registered plugins
    if let Some(c) = PLUGIN_TYPE_RE.captures(spec)
        && let Some(def) = plugins.get(&c[1])
    {
        let name = c[1].to_string();
        let arg = c.get(2).map_or("", |m| m.as_str()).trim().to_string();
        if let Some(pattern) = def.arg_pattern.as_deref() {
            check_arg_pattern(spec, pattern, &arg)?;
        }
        return Ok(AnswerSpec {
            qtype: Some(QType::Plugin {
                name: name.clone(),
                args: arg.clone(),
            }),
            correct: (!arg.is_empty()).then(|| CorrectSpec::Plugin {
                name: name.clone(),
                action: "response".to_string(),
                arg,
            }),
            required_plugin: Some(name),
            options: AnswerOptions::default(),
        });
    }

    if has_choices && CHOICE_LETTERS_RE.is_match(spec) {
        let letters = choice_letters(spec);
        let qtype = if letters.len() > 1 {
            QType::MultiChoice
        } else {
            QType::Choice
        };
        return Ok(answer(Some(qtype), Some(CorrectSpec::Choices { letters })));
    }

    Ok(answer(
        Some(QType::Text),
        Some(CorrectSpec::Literal {
            value: spec.to_string(),
        }),
    ))
}

fn check_arg_pattern(spec: &str, pattern: &str, arg: &str) -> Result<(), SyntaxError> {
    let re = Regex::new(pattern)
        .map_err(|e| invalid(spec, format!("bad plugin argument pattern '{pattern}': {e}")))?;
    if re.is_match(arg) {
        Ok(())
    } else {
        Err(invalid(
            spec,
            format!("argument '{arg}' does not match '{pattern}'"),
        ))
    }
}

fn choice_letters(s: &str) -> BTreeSet<char> {
    s.chars().map(|c| c.to_ascii_uppercase()).collect()
}

fn typed_value(spec: &str, qtype: &QType, value: &str) -> Result<Option<CorrectSpec>, SyntaxError> {
    if value.is_empty() {
        return Ok(None);
    }
    match qtype {
        QType::Choice | QType::MultiChoice => {
            if !CHOICE_LETTERS_RE.is_match(value) {
                return Err(invalid(spec, "expected choice letters"));
            }
            let letters = choice_letters(value);
            if letters.len() > 1 && *qtype == QType::Choice {
                return Err(invalid(spec, "more than one correct choice requires multichoice"));
            }
            Ok(Some(CorrectSpec::Choices { letters }))
        }
        QType::Number => match parse_number(value)? {
            Some(number) => Ok(Some(number)),
            None => Err(invalid(spec, "expected a number")),
        },
        _ => Ok(Some(CorrectSpec::Literal {
            value: value.to_string(),
        })),
    }
}

/// `v`, `v +/- e`, `v e`, `v +/- p%`
fn parse_number(text: &str) -> Result<Option<CorrectSpec>, SyntaxError> {
    let Some(c) = NUMBER_ANSWER_RE.captures(text) else {
        return Ok(None);
    };
    let value: f64 = c[1].parse().map_err(|_| invalid(text, "bad number"))?;
    let error = match c.get(2) {
        Some(m) => {
            let e: f64 = m.as_str().parse().map_err(|_| invalid(text, "bad error"))?;
            if c.get(3).is_some() {
                value.abs() * e / 100.0
            } else {
                e
            }
        }
        None => 0.0,
    };
    Ok(Some(CorrectSpec::Number { value, error }))
}

/// Parse the option list after the answer
pub fn parse_options(text: &str) -> Result<AnswerOptions, SyntaxError> {
    let mut opts = AnswerOptions::default();
    for word in shell_words(text)? {
        let (name, value) = match word.split_once('=') {
            Some((n, v)) => (n.trim(), v.trim()),
            None if word.starts_with(|c: char| c.is_ascii_digit() || c == '.') => ("weight", word.as_str()),
            None => return Err(bad_option(&word, "expected name=value")),
        };
        match name {
            "weight" => parse_weights(&word, value, &mut opts)?,
            "retry" => {
                let parts = numbers::<u32>(&word, value)?;
                opts.retry = match parts.as_slice() {
                    [count] => Some(Retry { count: *count, delay: 0 }),
                    [count, delay] => Some(Retry { count: *count, delay: *delay }),
                    _ => return Err(bad_option(&word, "expected retry=count[,delay]")),
                };
            }
            "explain" => {
                opts.question.explain = Some(match value {
                    "text" => Explain::Text,
                    "markdown" => Explain::Markdown,
                    _ => return Err(bad_option(&word, "expected text or markdown")),
                })
            }
            "share" => {
                opts.question.share = Some(match value {
                    "after_answering" => Share::AfterAnswering,
                    "after_grading" => Share::AfterGrading,
                    "never" => Share::Never,
                    _ => {
                        return Err(bad_option(
                            &word,
                            "expected after_answering, after_grading or never",
                        ));
                    }
                })
            }
            "vote" => {
                opts.question.vote = Some(match value {
                    "show_completed" => Vote::ShowCompleted,
                    "show_live" => Vote::ShowLive,
                    _ => return Err(bad_option(&word, "expected show_completed or show_live")),
                })
            }
            "team" => {
                opts.question.team = Some(match value {
                    "response" => Team::Response,
                    "setup" => Team::Setup,
                    _ => return Err(bad_option(&word, "expected response or setup")),
                })
            }
            "disabled" => opts.question.disabled = yes_no(&word, value)?,
            "participation" => opts.question.participation = yes_no(&word, value)?,
            _ => return Err(bad_option(&word, "unknown option")),
        }
    }
    if opts.question.vote.is_some() && opts.question.share.is_none() {
        return Err(bad_option("vote", "vote requires share"));
    }
    Ok(opts)
}

fn bad_option(option: &str, reason: &str) -> SyntaxError {
    SyntaxError::InvalidOption {
        option: option.to_string(),
        reason: reason.to_string(),
    }
}

fn yes_no(word: &str, value: &str) -> Result<bool, SyntaxError> {
    match value {
        "yes" => Ok(true),
        "no" => Ok(false),
        _ => Err(bad_option(word, "expected yes or no")),
    }
}

fn numbers<T: std::str::FromStr>(word: &str, value: &str) -> Result<Vec<T>, SyntaxError> {
    value
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<T>()
                .map_err(|_| bad_option(word, "expected a number"))
        })
        .collect()
}

fn parse_weights(word: &str, value: &str, opts: &mut AnswerOptions) -> Result<(), SyntaxError> {
    let weights = numbers::<f64>(word, value)?;
    if weights.iter().any(|w| *w < 0.0 || !w.is_finite()) {
        return Err(bad_option(word, "weights must be non-negative"));
    }
    match weights.as_slice() {
        [s] => opts.weight = *s,
        [s, g] => {
            opts.weight = *s;
            opts.gweight = Some(*g);
        }
        [s, g, v] => {
            opts.weight = *s;
            opts.gweight = Some(*g);
            opts.vweight = *v;
        }
        _ => return Err(bad_option(word, "expected weight=s[,g[,v]]")),
    }
    Ok(())
}

/// Split like a POSIX shell: whitespace separated, quotes group, `\`
/// escapes the next character
fn shell_words(text: &str) -> Result<Vec<String>, SyntaxError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(bad_option(text, &format!("unterminated {q} quote")));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginDef;

    fn parse(text: &str) -> Result<AnswerSpec, SyntaxError> {
        parse_answer(text, false, &PluginRegistry::new())
    }

    #[test]
    fn test_number_with_error() {
        let a = parse("3.5 +/- 0.2").unwrap();
        assert_eq!(a.qtype, Some(QType::Number));
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Number {
                value: 3.5,
                error: 0.2
            })
        );

        let a = parse("200 5%").unwrap();
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Number {
                value: 200.0,
                error: 10.0
            })
        );

        let a = parse("-4").unwrap();
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Number {
                value: -4.0,
                error: 0.0
            })
        );
    }

    #[test]
    fn test_explicit_type() {
        let a = parse("choice=B").unwrap();
        assert_eq!(a.qtype, Some(QType::Choice));
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Choices {
                letters: BTreeSet::from(['B'])
            })
        );

        let a = parse("multichoice=ac").unwrap();
        assert_eq!(a.qtype, Some(QType::MultiChoice));

        assert!(matches!(
            parse("choice=AB"),
            Err(SyntaxError::InvalidAnswer { .. })
        ));
        assert!(matches!(
            parse("number=ten"),
            Err(SyntaxError::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn test_unknown_keyword_is_a_text_answer() {
        let a = parse("x=5").unwrap();
        assert_eq!(a.qtype, Some(QType::Text));
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Literal {
                value: "x=5".into()
            })
        );

        let a = parse("colour = red").unwrap();
        assert_eq!(a.qtype, Some(QType::Text));
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Literal {
                value: "colour = red".into()
            })
        );
    }

    #[test]
    fn test_plugin_binding() {
        let a = parse("=MyPlugin.expect(2)").unwrap();
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Plugin {
                name: "MyPlugin".into(),
                action: "expect".into(),
                arg: "2".into()
            })
        );
        assert_eq!(a.required_plugin.as_deref(), Some("MyPlugin"));
    }

    #[test]
    fn test_plugin_arg_pattern() {
        let plugins = PluginRegistry::new().with(
            "Code",
            PluginDef {
                arg_pattern: Some(r"^(python|rust)$".into()),
                ..PluginDef::default()
            },
        );
        let a = parse_answer("Code/python", false, &plugins).unwrap();
        assert_eq!(
            a.qtype,
            Some(QType::Plugin {
                name: "Code".into(),
                args: "python".into()
            })
        );
        assert!(parse_answer("Code/cobol", false, &plugins).is_err());
        assert!(parse_answer("=Code.run(cobol)", false, &plugins).is_err());
        // unregistered names are plain text
        assert_eq!(
            parse_answer("Other/thing", false, &plugins).unwrap().qtype,
            Some(QType::Text)
        );
    }

    #[test]
    fn test_keywords_letters_and_text() {
        assert_eq!(parse("text/code").unwrap().qtype, Some(QType::TextCode));
        assert_eq!(parse("").unwrap().qtype, None);

        let a = parse_answer("BD", true, &PluginRegistry::new()).unwrap();
        assert_eq!(a.qtype, Some(QType::MultiChoice));

        let a = parse("BD").unwrap();
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Literal { value: "BD".into() })
        );
        let a = parse("a\\; b; weight=2").unwrap();
        assert_eq!(
            a.correct,
            Some(CorrectSpec::Literal {
                value: "a; b".into()
            })
        );
        assert_eq!(a.options.weight, 2.0);
    }

    #[test]
    fn test_options() {
        let o = parse_options("weight=2,1,0.5 retry=3,60 explain=markdown share=after_grading vote=show_live team=setup disabled=yes participation=no").unwrap();
        assert_eq!((o.weight, o.gweight, o.vweight), (2.0, Some(1.0), 0.5));
        assert_eq!(o.retry, Some(Retry { count: 3, delay: 60 }));
        assert_eq!(o.question.explain, Some(Explain::Markdown));
        assert_eq!(o.question.share, Some(Share::AfterGrading));
        assert_eq!(o.question.vote, Some(Vote::ShowLive));
        assert_eq!(o.question.team, Some(Team::Setup));
        assert!(o.question.disabled);
        assert!(!o.question.participation);

        assert_eq!(parse_options("4").unwrap().weight, 4.0);
    }

    #[test]
    fn test_bad_options_are_fatal() {
        for bad in [
            "weight=-1",
            "weight=1,2,3,4",
            "retry=x",
            "share=sometimes",
            "vote=show_live",
            "color=red",
            "explain",
            "explain='text",
        ] {
            assert!(
                matches!(parse_options(bad), Err(SyntaxError::InvalidOption { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_shell_words() {
        assert_eq!(
            shell_words(r#"a="b c" 'd e' f\ g"#).unwrap(),
            vec!["a=b c", "d e", "f g"]
        );
    }
}
