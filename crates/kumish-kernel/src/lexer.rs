//! Lexer for shell source text.
//!
//! Converts source text into a stream of tokens using the logos lexer
//! generator. Words keep their quotes; stripping them is the job of
//! expansion, which needs to know what was quoted.
//!
//! # Token Categories
//!
//! - **Operators**: `|`, `||`, `&`, `&&`, `;`, `!`
//! - **Redirections**: `<`, `>`, `>|`, `>>`, `<>`, `<&`, `>&`, each with an
//!   optional descriptor prefix (`2>`)
//! - **Words**: unquoted text, `'...'`, `"..."` and backslash escapes glued
//!   together
//! - **Structure**: newlines and `#` comments

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    UnterminatedQuote,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::UnterminatedQuote => write!(f, "unterminated quoted string"),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
#[logos(skip r"([ \t\r]|\\\n)+")]
pub enum Token {
    #[token("||")]
    Or,

    #[token("|")]
    Pipe,

    #[token("&&")]
    And,

    #[token("&")]
    Amp,

    #[token(";")]
    Semi,

    #[token("!")]
    Bang,

    /// Redirection operator, descriptor prefix included: `2>>` → `"2>>"`
    #[regex(r"[0-9]*(<>|>>|>\||>&|<&|<|>)", |lex| lex.slice().to_string())]
    Redirect(String),

    /// A word with its quotes intact.
    #[regex(
        r#"([^\s|&;<>()'"\\#!]|\\.|'[^']*'|"([^"\\]|\\.)*")([^\s|&;<>()'"\\]|\\.|'[^']*'|"([^"\\]|\\.)*")*"#,
        |lex| lex.slice().to_string(),
        allow_greedy = true
    )]
    Word(String),

    /// Comment: `# ...` to end of line
    #[regex(r"#[^\n]*", allow_greedy = true)]
    Comment,

    #[token("\n")]
    Newline,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Or => write!(f, "'||'"),
            Token::Pipe => write!(f, "'|'"),
            Token::And => write!(f, "'&&'"),
            Token::Amp => write!(f, "'&'"),
            Token::Semi => write!(f, "';'"),
            Token::Bang => write!(f, "'!'"),
            Token::Redirect(op) => write!(f, "'{op}'"),
            Token::Word(w) => write!(f, "word '{w}'"),
            Token::Comment => write!(f, "comment"),
            Token::Newline => write!(f, "newline"),
        }
    }
}

/// Split a redirection token into its descriptor prefix and operator.
pub fn split_redirect(token: &str) -> (Option<i32>, &str) {
    let digits = token.bytes().take_while(u8::is_ascii_digit).count();
    let fd = if digits == 0 {
        None
    } else {
        token[..digits].parse().ok()
    };
    (fd, &token[digits..])
}

/// Tokenize source text, dropping comments.
///
/// All errors are collected so the caller can report the first one with
/// a useful offset.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(Token::Comment) => {}
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => {
                let err = match source[span.clone()].chars().next() {
                    Some('\'' | '"') => LexerError::UnterminatedQuote,
                    _ => err,
                };
                errors.push(Spanned::new(err, span));
            }
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("lexer should succeed")
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn word(s: &str) -> Token {
        Token::Word(s.to_string())
    }

    #[test]
    fn operators() {
        assert_eq!(
            lex("a | b || c && d & e ; f"),
            vec![
                word("a"),
                Token::Pipe,
                word("b"),
                Token::Or,
                word("c"),
                Token::And,
                word("d"),
                Token::Amp,
                word("e"),
                Token::Semi,
                word("f"),
            ]
        );
    }

    #[test]
    fn operators_without_spaces() {
        assert_eq!(
            lex("a|b&"),
            vec![word("a"), Token::Pipe, word("b"), Token::Amp]
        );
    }

    #[test]
    fn redirections_with_prefix() {
        assert_eq!(
            lex("cmd 2>err >>log <in 3<>rw 2>&1"),
            vec![
                word("cmd"),
                Token::Redirect("2>".into()),
                word("err"),
                Token::Redirect(">>".into()),
                word("log"),
                Token::Redirect("<".into()),
                word("in"),
                Token::Redirect("3<>".into()),
                word("rw"),
                Token::Redirect("2>&".into()),
                word("1"),
            ]
        );
    }

    #[test]
    fn digits_inside_word_are_not_a_prefix() {
        assert_eq!(
            lex("a2>f"),
            vec![word("a2"), Token::Redirect(">".into()), word("f")]
        );
    }

    #[test]
    fn quotes_stay_glued_to_words() {
        assert_eq!(
            lex(r#"echo 'a b'"c d"e \; x"#),
            vec![word("echo"), word(r#"'a b'"c d"e"#), word(r"\;"), word("x")]
        );
    }

    #[test]
    fn comments_and_newlines() {
        assert_eq!(
            lex("a # trailing | stuff\nb"),
            vec![word("a"), Token::Newline, word("b")]
        );
    }

    #[test]
    fn hash_inside_word_is_literal() {
        assert_eq!(lex("a#b"), vec![word("a#b")]);
    }

    #[test]
    fn line_continuation_is_skipped() {
        assert_eq!(lex("a \\\n b"), vec![word("a"), word("b")]);
    }

    #[test]
    fn bang_is_an_operator() {
        assert_eq!(lex("! true"), vec![Token::Bang, word("true")]);
    }

    #[test]
    fn unterminated_quote() {
        let errors = tokenize("echo 'oops").expect_err("should fail");
        assert_eq!(errors[0].token, LexerError::UnterminatedQuote);
    }

    #[test]
    fn split_redirect_prefix() {
        assert_eq!(split_redirect("2>>"), (Some(2), ">>"));
        assert_eq!(split_redirect("<&"), (None, "<&"));
    }
}
