//! Word expansion: quote removal, parameter references and tilde.
//!
//! Deliberately small. Each word expands to exactly one field; there is no
//! field splitting and no pathname expansion.

use crate::ast::Word;
use crate::paths::home_dir;
use crate::state::ShellState;

/// Expand a list of words into an argument vector.
pub fn expand_words(words: &[Word], state: &ShellState) -> Vec<String> {
    words.iter().map(|w| expand_word(w, state)).collect()
}

/// Expand one word.
pub fn expand_word(word: &Word, state: &ShellState) -> String {
    let raw = word.as_str();
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    if raw.starts_with('~') && matches!(raw[1..].chars().next(), None | Some('/')) {
        chars.next();
        out.push_str(&home_dir().to_string_lossy());
    }

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    out.push(c);
                }
            }
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => match chars.peek() {
                            Some(&next @ ('$' | '`' | '"' | '\\')) => {
                                out.push(next);
                                chars.next();
                            }
                            _ => out.push('\\'),
                        },
                        '$' => expand_parameter(&mut chars, state, &mut out),
                        other => out.push(other),
                    }
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' => expand_parameter(&mut chars, state, &mut out),
            other => out.push(other),
        }
    }

    out
}

/// Expand the parameter following a `$`, which has already been consumed.
fn expand_parameter(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    state: &ShellState,
    out: &mut String,
) {
    match chars.peek().copied() {
        Some('{') => {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }
            if !closed {
                out.push_str("${");
                out.push_str(&name);
                return;
            }
            out.push_str(&lookup(&name, state));
        }
        Some(c) if state.special(c).is_some() => {
            chars.next();
            out.push_str(&lookup(&c.to_string(), state));
        }
        Some(c) if c.is_ascii_digit() => {
            // Positional parameters other than $0 are always unset.
            chars.next();
        }
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '_' || c.is_ascii_alphanumeric() {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push_str(&lookup(&name, state));
        }
        _ => out.push('$'),
    }
}

fn lookup(name: &str, state: &ShellState) -> String {
    let mut special = name.chars();
    if let (Some(c), None) = (special.next(), special.next()) {
        if let Some(value) = state.special(c) {
            return value;
        }
    }
    std::env::var(name).unwrap_or_default()
}
