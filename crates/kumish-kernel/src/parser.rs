//! Parser for shell source text.
//!
//! Transforms the lexer's token stream into a [`Program`]. The grammar is
//! small enough for plain recursive descent:
//!
//! ```text
//! program   := sep* (list (sep+ list)*)? sep*
//! list      := and_or ['&']
//! and_or    := pipeline (('&&' | '||') '\n'* pipeline)*
//! pipeline  := ['!'] command ('|' '\n'* command)* ['|']
//! command   := (WORD | REDIRECT WORD)+
//! sep       := ';' | '\n' | '&'
//! ```
//!
//! A `|` with nothing after it on the line closes the pipeline into a loop:
//! the last command's output feeds the first command's input.

use crate::ast::{AndOrList, Command, Connector, Pipeline, Program, Redirect, RedirectOp, Word};
use crate::error::ParseError;
use crate::lexer::{self, Spanned, Token};

/// Parse a source buffer into a program.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lexer::tokenize(source).map_err(|errs| {
        let first = &errs[0];
        ParseError::Lex {
            offset: first.span.start,
            message: first.token.to_string(),
        }
    })?;

    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    parser.program()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned<Token>>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(spanned) => ParseError::Unexpected {
                offset: spanned.span.start,
                found: spanned.token.to_string(),
            },
            None => ParseError::UnexpectedEof,
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn program(&mut self) -> Result<Program, ParseError> {
        let mut lists = Vec::new();
        loop {
            while matches!(self.peek(), Some(Token::Semi | Token::Newline)) {
                self.pos += 1;
            }
            if self.peek().is_none() {
                break;
            }
            let mut list = self.and_or()?;
            match self.peek() {
                Some(Token::Amp) => {
                    self.pos += 1;
                    list.background = true;
                }
                Some(Token::Semi | Token::Newline) | None => {}
                Some(_) => return Err(self.unexpected()),
            }
            lists.push(list);
        }
        Ok(Program { lists })
    }

    fn and_or(&mut self) -> Result<AndOrList, ParseError> {
        let first = self.pipeline()?;
        let mut rest = Vec::new();
        loop {
            let connector = match self.peek() {
                Some(Token::And) => Connector::And,
                Some(Token::Or) => Connector::Or,
                _ => break,
            };
            self.pos += 1;
            self.skip_newlines();
            rest.push((connector, self.pipeline()?));
        }
        Ok(AndOrList {
            first,
            rest,
            background: false,
        })
    }

    fn pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let negated = if self.at(&Token::Bang) {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut commands = vec![self.command()?];
        let mut looped = false;
        while self.at(&Token::Pipe) {
            self.pos += 1;
            if self.ends_pipeline() {
                looped = true;
                break;
            }
            self.skip_newlines();
            commands.push(self.command()?);
        }

        Ok(Pipeline {
            commands,
            negated,
            looped,
        })
    }

    /// True if the next tokens cannot start another command on this line.
    fn ends_pipeline(&self) -> bool {
        match self.peek() {
            None | Some(Token::Semi | Token::Amp | Token::And | Token::Or) => true,
            Some(Token::Newline) => {
                let next = self.tokens[self.pos..]
                    .iter()
                    .find(|s| s.token != Token::Newline);
                next.is_none()
            }
            _ => false,
        }
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        let start = match self.tokens.get(self.pos) {
            Some(spanned) => spanned.span.start,
            None => return Err(ParseError::UnexpectedEof),
        };
        let mut end = start;
        let mut words = Vec::new();
        let mut redirects = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Word(_)) => {
                    if let Some(Spanned {
                        token: Token::Word(w),
                        span,
                    }) = self.advance()
                    {
                        end = span.end;
                        words.push(Word(w.clone()));
                    }
                }
                Some(Token::Redirect(_)) => {
                    let redirect = self.redirect()?;
                    end = self.tokens[self.pos - 1].span.end;
                    redirects.push(redirect);
                }
                _ => break,
            }
        }

        if words.is_empty() && redirects.is_empty() {
            return Err(self.unexpected());
        }

        Ok(Command {
            words,
            redirects,
            text: self.source[start..end].to_string(),
        })
    }

    fn redirect(&mut self) -> Result<Redirect, ParseError> {
        let (offset, raw) = match self.advance() {
            Some(Spanned {
                token: Token::Redirect(raw),
                span,
            }) => (span.start, raw.clone()),
            _ => return Err(self.unexpected()),
        };
        let (fd, symbol) = lexer::split_redirect(&raw);
        let op = RedirectOp::from_symbol(symbol).ok_or_else(|| ParseError::Unexpected {
            offset,
            found: raw.clone(),
        })?;

        match self.peek() {
            Some(Token::Word(_)) => {}
            _ => return Err(self.unexpected()),
        }
        let target = match self.advance() {
            Some(Spanned {
                token: Token::Word(w),
                ..
            }) => Word(w.clone()),
            _ => return Err(ParseError::UnexpectedEof),
        };

        Ok(Redirect { fd, op, target })
    }
}
