// src/transform/builtin.rs

//! Built-in transforms used when no external tool is configured.
//!
//! These are deliberately small: comment/whitespace minifiers, `$variable`
//! substitution for stylesheets and a handful of lint rules. They operate on
//! text and understand quoted strings and script regex literals, but no other
//! grammar; configure a real tool under `[tools]` for production output.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{BuildError, Result};
use crate::transform::{LintFinding, Linter, Transform};

struct MinifyRules {
    /// `//` starts a comment.
    line_comments: bool,
    /// `/` in operand position starts a regex literal, copied verbatim.
    regex_literals: bool,
    /// Newlines survive as `\n` (statement boundaries in scripts).
    keep_newlines: bool,
    /// No whitespace is kept next to these characters.
    tight: &'static [char],
}

const CSS_RULES: MinifyRules = MinifyRules {
    line_comments: false,
    regex_literals: false,
    keep_newlines: false,
    tight: &['{', '}', ';', ',', '>'],
};

const JS_RULES: MinifyRules = MinifyRules {
    line_comments: true,
    regex_literals: true,
    keep_newlines: true,
    tight: &['{', '}', '(', ')', ';', ',', '=', '[', ']'],
};

fn minify_text(input: &str, rules: &MinifyRules) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut ws = Whitespace::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '"' || c == '\'' || (rules.line_comments && c == '`') {
            ws.flush(&mut out, c, rules);
            out.push(c);
            i += 1;
            while i < chars.len() {
                let d = chars[i];
                out.push(d);
                i += 1;
                if d == '\\' {
                    if let Some(&escaped) = chars.get(i) {
                        out.push(escaped);
                        i += 1;
                    }
                } else if d == c {
                    break;
                }
            }
            continue;
        }

        if c == '/' && next == Some('*') {
            let mut j = i + 2;
            while j + 1 < chars.len() && !(chars[j] == '*' && chars[j + 1] == '/') {
                if chars[j] == '\n' && rules.keep_newlines {
                    ws.newline = true;
                }
                j += 1;
            }
            ws.space = true;
            i = (j + 2).min(chars.len());
            continue;
        }

        if rules.line_comments && c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if rules.regex_literals && c == '/' && regex_allowed(&out) {
            if let Some(end) = regex_literal_end(&chars, i) {
                ws.flush(&mut out, c, rules);
                out.extend(&chars[i..end]);
                i = end;
                continue;
            }
        }

        if c.is_whitespace() {
            if c == '\n' && rules.keep_newlines {
                ws.newline = true;
            } else {
                ws.space = true;
            }
            i += 1;
            continue;
        }

        ws.flush(&mut out, c, rules);
        out.push(c);
        i += 1;
    }

    out
}

/// Keywords after which `/` opens a regex literal rather than dividing.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Whether a `/` following the emitted text is in operand position.
fn regex_allowed(out: &str) -> bool {
    let before = out.trim_end();
    let Some(prev) = before.chars().last() else {
        return true;
    };
    if "(,=:[!&|?{};+-*%<>~^".contains(prev) {
        return true;
    }
    let word_start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '$')
        .last()
        .map_or(before.len(), |(pos, _)| pos);
    REGEX_KEYWORDS.contains(&&before[word_start..])
}

/// End (exclusive) of the regex literal opening at `start`, flags excluded.
/// `None` if the line ends first, in which case `/` is division.
fn regex_literal_end(chars: &[char], start: usize) -> Option<usize> {
    let mut in_class = false;
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j] {
            '\\' => j += 1,
            '\n' | '\r' => return None,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return Some(j + 1),
            _ => {}
        }
        j += 1;
    }
    None
}

/// Whitespace seen since the last emitted character.
#[derive(Default)]
struct Whitespace {
    space: bool,
    newline: bool,
}

impl Whitespace {
    fn flush(&mut self, out: &mut String, next: char, rules: &MinifyRules) {
        let prev = out.chars().last();
        if self.newline {
            if prev.is_some_and(|p| p != '\n') {
                out.push('\n');
            }
        } else if self.space {
            if let Some(p) = prev {
                if p != '\n' && !rules.tight.contains(&p) && !rules.tight.contains(&next) {
                    out.push(' ');
                }
            }
        }
        self.space = false;
        self.newline = false;
    }
}

fn utf8<'a>(stage: &str, path: &str, input: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(input).map_err(|e| BuildError::Transform {
        stage: stage.to_string(),
        path: path.to_string(),
        message: format!("not valid UTF-8: {e}"),
    })
}

/// Strips comments and redundant whitespace from stylesheets.
#[derive(Debug, Default, Clone)]
pub struct CssMinifier;

impl Transform for CssMinifier {
    fn name(&self) -> &str {
        "css-minify"
    }

    fn apply(&self, path: &str, input: &[u8]) -> Result<Vec<u8>> {
        let text = utf8(self.name(), path, input)?;
        Ok(minify_text(text, &CSS_RULES).into_bytes())
    }
}

/// Strips comments and redundant whitespace from scripts. Line breaks are
/// kept so automatic semicolon insertion is unaffected; names are not
/// mangled.
#[derive(Debug, Default, Clone)]
pub struct JsMinifier;

impl Transform for JsMinifier {
    fn name(&self) -> &str {
        "js-minify"
    }

    fn apply(&self, path: &str, input: &[u8]) -> Result<Vec<u8>> {
        let text = utf8(self.name(), path, input)?;
        Ok(minify_text(text, &JS_RULES).into_bytes())
    }
}

static VAR_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\$([A-Za-z_][A-Za-z0-9_-]*)[ \t]*:[ \t]*([^;\n]+?)[ \t]*;[ \t]*\r?\n?")
        .expect("valid variable declaration regex")
});

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_-]*)").expect("valid variable reference regex")
});

/// Stylesheet variables: `$name: value;` lines are removed and every later
/// `$name` is replaced by its value. Using an undefined variable is an error.
#[derive(Debug, Default, Clone)]
pub struct StyleVariables;

impl StyleVariables {
    fn substitute(&self, path: &str, text: &str, vars: &HashMap<String, String>) -> Result<String> {
        let mut missing = None;
        let replaced = VAR_REF.replace_all(text, |caps: &regex::Captures<'_>| {
            match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });

        match missing {
            Some(name) => Err(BuildError::Transform {
                stage: self.name().to_string(),
                path: path.to_string(),
                message: format!("undefined variable ${name}"),
            }),
            None => Ok(replaced.into_owned()),
        }
    }
}

impl Transform for StyleVariables {
    fn name(&self) -> &str {
        "style-variables"
    }

    fn apply(&self, path: &str, input: &[u8]) -> Result<Vec<u8>> {
        let text = utf8(self.name(), path, input)?;

        let mut vars = HashMap::new();
        for caps in VAR_DECL.captures_iter(text) {
            let value = self.substitute(path, &caps[2], &vars)?;
            vars.insert(caps[1].to_string(), value);
        }

        let body = VAR_DECL.replace_all(text, "");
        Ok(self.substitute(path, &body, &vars)?.into_bytes())
    }
}

struct LineRule {
    pattern: Regex,
    message: &'static str,
}

fn lint_lines(linter: &str, path: &str, text: &str, rules: &[LineRule]) -> Vec<LintFinding> {
    let mut findings = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        for rule in rules {
            if rule.pattern.is_match(line) {
                findings.push(LintFinding {
                    linter: linter.to_string(),
                    path: path.to_string(),
                    line: Some(idx + 1),
                    message: rule.message.to_string(),
                });
            }
        }
    }
    findings
}

static CSS_LINE_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        LineRule {
            pattern: Regex::new(r"!important").expect("valid css lint regex"),
            message: "avoid !important",
        },
        LineRule {
            pattern: Regex::new(r"\{\s*\}").expect("valid css lint regex"),
            message: "empty rule",
        },
        LineRule {
            pattern: Regex::new(r"#[0-9A-Fa-f]{1,2}\b|#[0-9A-Fa-f]{4,5}\b|#[0-9A-Fa-f]{7,}\b")
                .expect("valid css lint regex"),
            message: "malformed hex colour",
        },
    ]
});

static JS_LINE_RULES: LazyLock<Vec<LineRule>> = LazyLock::new(|| {
    vec![
        LineRule {
            pattern: Regex::new(r"\bdebugger\b").expect("valid js lint regex"),
            message: "debugger statement",
        },
        LineRule {
            pattern: Regex::new(r"\beval\s*\(").expect("valid js lint regex"),
            message: "eval can be harmful",
        },
        LineRule {
            pattern: Regex::new(r"[^=!<>]==[^=]|!=[^=]").expect("valid js lint regex"),
            message: "use strict equality (=== / !==)",
        },
    ]
});

#[derive(Debug, Default, Clone)]
pub struct CssLinter;

impl Linter for CssLinter {
    fn name(&self) -> &str {
        "css-lint"
    }

    fn lint(&self, path: &str, input: &[u8]) -> Result<Vec<LintFinding>> {
        let text = String::from_utf8_lossy(input);
        Ok(lint_lines(self.name(), path, &text, &CSS_LINE_RULES))
    }
}

#[derive(Debug, Default, Clone)]
pub struct JsLinter;

impl Linter for JsLinter {
    fn name(&self) -> &str {
        "js-lint"
    }

    fn lint(&self, path: &str, input: &[u8]) -> Result<Vec<LintFinding>> {
        let text = String::from_utf8_lossy(input);
        Ok(lint_lines(self.name(), path, &text, &JS_LINE_RULES))
    }
}
