//! AST type definitions.

use std::fmt;
use std::os::fd::RawFd;

/// A parsed source buffer: a sequence of and-or lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub lists: Vec<AndOrList>,
}

/// `a && b || c`, optionally run in the background with a trailing `&`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndOrList {
    pub first: Pipeline,
    pub rest: Vec<(Connector, Pipeline)>,
    pub background: bool,
}

impl AndOrList {
    /// Source text of the whole list, used as a job name when it runs in a
    /// subshell.
    pub fn text(&self) -> String {
        let mut text = self.first.text();
        for (connector, pipeline) in &self.rest {
            text.push(' ');
            text.push_str(&connector.to_string());
            text.push(' ');
            text.push_str(&pipeline.text());
        }
        text
    }

    /// True if the list is a single pipeline with no `&&`/`||` chain.
    pub fn is_simple(&self) -> bool {
        self.rest.is_empty()
    }
}

/// Conditional chaining between pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `&&` runs the next pipeline only if the previous one succeeded.
    And,
    /// `||` runs the next pipeline only if the previous one failed.
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connector::And => write!(f, "&&"),
            Connector::Or => write!(f, "||"),
        }
    }
}

/// Commands connected by pipes: `a | b | c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    /// Leading `!`: the exit status is logically inverted.
    pub negated: bool,
    /// Trailing `|`: the last command's output feeds the first command.
    pub looped: bool,
}

impl Pipeline {
    /// Display text: stage texts joined with ` | `.
    pub fn text(&self) -> String {
        let mut text = String::new();
        if self.negated {
            text.push_str("! ");
        }
        let stages: Vec<&str> = self.commands.iter().map(|c| c.text.as_str()).collect();
        text.push_str(&stages.join(" | "));
        if self.looped {
            text.push_str(" |");
        }
        text
    }
}

/// A simple command: words plus redirections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub words: Vec<Word>,
    pub redirects: Vec<Redirect>,
    /// Source text of the command, whitespace preserved.
    pub text: String,
}

/// A word exactly as written, quotes included. Expansion strips quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word(pub String);

impl Word {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `[fd]op target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Explicit descriptor prefix, if written (`2>`).
    pub fd: Option<RawFd>,
    pub op: RedirectOp,
    pub target: Word,
}

impl Redirect {
    /// The descriptor this redirection applies to.
    pub fn target_fd(&self) -> RawFd {
        self.fd.unwrap_or_else(|| self.op.default_fd())
    }
}

/// Redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectOp {
    /// `<` read from file
    Read,
    /// `>` write, truncating
    Write,
    /// `>|` write, truncating (no noclobber distinction)
    Clobber,
    /// `>>` append
    Append,
    /// `<>` open read-write
    ReadWrite,
    /// `<&` duplicate or close an input descriptor
    DupInput,
    /// `>&` duplicate or close an output descriptor
    DupOutput,
}

impl RedirectOp {
    /// Descriptor used when no prefix is written.
    pub fn default_fd(&self) -> RawFd {
        match self {
            RedirectOp::Read | RedirectOp::ReadWrite | RedirectOp::DupInput => 0,
            RedirectOp::Write | RedirectOp::Clobber | RedirectOp::Append | RedirectOp::DupOutput => 1,
        }
    }

    /// Parse the operator part of a redirection token.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "<" => RedirectOp::Read,
            ">" => RedirectOp::Write,
            ">|" => RedirectOp::Clobber,
            ">>" => RedirectOp::Append,
            "<>" => RedirectOp::ReadWrite,
            "<&" => RedirectOp::DupInput,
            ">&" => RedirectOp::DupOutput,
            _ => return None,
        })
    }
}

impl fmt::Display for RedirectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectOp::Read => write!(f, "<"),
            RedirectOp::Write => write!(f, ">"),
            RedirectOp::Clobber => write!(f, ">|"),
            RedirectOp::Append => write!(f, ">>"),
            RedirectOp::ReadWrite => write!(f, "<>"),
            RedirectOp::DupInput => write!(f, "<&"),
            RedirectOp::DupOutput => write!(f, ">&"),
        }
    }
}
