//! getopt-style option parsing for builtins.

use std::collections::{HashMap, HashSet};

/// Parsed builtin arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinArgs {
    /// Operands after the options, in order.
    pub positional: Vec<String>,
    /// Options without a value (`-l`).
    pub flags: HashSet<char>,
    /// Options with a value (`-s TERM`, `-sTERM`).
    pub values: HashMap<char, String>,
}

/// Option parsing failure, printed as `name: -x: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    Unknown(char),
    MissingValue(char),
}

impl std::fmt::Display for ArgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgError::Unknown(c) => write!(f, "-{c}: invalid option"),
            ArgError::MissingValue(c) => write!(f, "-{c}: option requires an argument"),
        }
    }
}

impl BuiltinArgs {
    /// Parse `args` against `optstring`, where a letter followed by `:` takes
    /// a value.
    ///
    /// Parsing stops at `--` (which is consumed) or at the first word that
    /// is not an option. A lone `-` is an operand.
    pub fn parse(args: &[String], optstring: &str) -> Result<Self, ArgError> {
        let mut parsed = Self::default();
        let mut iter = args.iter().peekable();

        while let Some(arg) = iter.peek() {
            if arg.as_str() == "--" {
                iter.next();
                break;
            }
            let Some(cluster) = arg.strip_prefix('-').filter(|c| !c.is_empty()) else {
                break;
            };
            let cluster = cluster.to_string();
            iter.next();

            for (i, c) in cluster.char_indices() {
                match takes_value(optstring, c) {
                    None => return Err(ArgError::Unknown(c)),
                    Some(false) => {
                        parsed.flags.insert(c);
                    }
                    Some(true) => {
                        let rest = &cluster[i + c.len_utf8()..];
                        let value = if rest.is_empty() {
                            iter.next().cloned().ok_or(ArgError::MissingValue(c))?
                        } else {
                            rest.to_string()
                        };
                        parsed.values.insert(c, value);
                        break;
                    }
                }
            }
        }

        parsed.positional = iter.cloned().collect();
        Ok(parsed)
    }

    pub fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }

    pub fn value(&self, option: char) -> Option<&str> {
        self.values.get(&option).map(String::as_str)
    }
}

fn takes_value(optstring: &str, option: char) -> Option<bool> {
    let mut chars = optstring.chars().peekable();
    while let Some(c) = chars.next() {
        let with_value = chars.peek() == Some(&':');
        if with_value {
            chars.next();
        }
        if c == option {
            return Some(with_value);
        }
    }
    None
}
