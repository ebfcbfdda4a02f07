//! Input deck parsing.
//!
//! GAMESS-style input decks are line oriented. Parameters live in records
//! delimited by `$NAME` and `$END`; everything outside those records is
//! ignored by the chemistry program but is kept here verbatim:
//!
//! ```text
//! ! RHF/6-31G(d) optimization of acetylene
//!  $CONTRL SCFTYP=RHF RUNTYP=OPTIMIZE COORD=ZMT NZVAR=5 $END
//!  $SYSTEM TIMLIM=2 MWORDS=1 $END
//!  $ZMAT   IZMAT(1)=1,1,2,  1,1,3,  1,2,4,
//!                 5,3,1,2,  5,1,2,4  $END
//!  $DATA
//! Acetylene
//! DNH      4
//! ...
//!  $END
//! ```
//!
//! # Line classes
//!
//! - **Comments**: the first non-blank character is `!`. Collected verbatim
//!   in every parser state.
//! - **Keyword groups**: the span between `$NAME` and `$END` is split into
//!   `KEY=VALUE` entries. A record may close on its opening line or run over
//!   many lines; several records may share one line.
//! - **Free-form groups** (`$DATA`, `$VEC`, ...): the body lines are kept
//!   exactly, blank lines included, since their columns are significant.
//! - **Outside text**: any other non-blank line, kept verbatim.
//!
//! # Stray tokens
//!
//! With [`EntryPolicy::Strict`] (the default) a token inside a keyword group
//! that is neither `KEY=VALUE` nor the continuation of an array value fails
//! with [`ParseError::MalformedEntry`]. [`EntryPolicy::Permissive`] keeps such
//! tokens in [`Group::unparsed`] and logs a warning instead.
//!
//! # Examples
//!
//! ```
//! use gmsdeck::parser::parse;
//!
//! let deck = parse(" $CONTRL SCFTYP=RHF RUNTYP=OPTIMIZE NZVAR=5 $END\n")?;
//! let contrl = deck.group("CONTRL").unwrap();
//! assert_eq!(contrl.value("RUNTYP"), Some("OPTIMIZE"));
//! # Ok::<(), gmsdeck::parser::ParseError>(())
//! ```

use crate::deck::{Entry, Group, InputDeck};
use crate::help;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Names of the groups documented as free-form in [`help::GROUPS`]:
/// `DATA`, `ECP`, `MCP`, `VEC`, `HESS`, `GRAD`, `EFRAG`, `FMOXYZ`, `POINTS`
/// and `STONE`.
pub fn default_freeform_groups() -> Vec<String> {
    help::GROUPS
        .iter()
        .filter(|g| g.freeform)
        .map(|g| g.name.to_string())
        .collect()
}

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"\S+").unwrap();
    static ref GROUP_NAME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    // KEY or KEY(<n>)
    static ref KEY_RE: Regex =
        Regex::new(r"^([A-Za-z][A-Za-z0-9_]*)(?:\(\s*(\d+)\s*\))?$").unwrap();
}

/// Error type for parsing operations.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading the deck
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A group was still open at end of input
    #[error("Unterminated group ${group} opened at line {line}: no $END before end of input")]
    UnterminatedGroup {
        /// Name of the open group
        group: String,
        /// Line on which the group was opened (1-based)
        line: usize,
    },
    /// A token inside a keyword group could not be classified
    #[error("Malformed entry '{token}' in ${group} at line {line}: {reason}")]
    MalformedEntry {
        /// Group containing the token
        group: String,
        /// Offending token
        token: String,
        /// Line of the token (1-based)
        line: usize,
        /// Why the token was rejected
        reason: String,
    },
    /// `$` not followed by an identifier
    #[error("Invalid group name '{token}' at line {line}")]
    InvalidGroupName {
        /// Offending token
        token: String,
        /// Line of the token (1-based)
        line: usize,
    },
    /// `$END` seen while no group was open
    #[error("Unexpected $END at line {line} outside any group")]
    UnexpectedEnd {
        /// Line of the stray `$END` (1-based)
        line: usize,
    },
}

impl ParseError {
    /// Line the error refers to, when it has one.
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Io(_) => None,
            ParseError::UnterminatedGroup { line, .. }
            | ParseError::MalformedEntry { line, .. }
            | ParseError::InvalidGroupName { line, .. }
            | ParseError::UnexpectedEnd { line } => Some(*line),
        }
    }
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

/// How tokens that are not entries are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPolicy {
    /// Reject with [`ParseError::MalformedEntry`]
    #[default]
    Strict,
    /// Keep in [`Group::unparsed`] and carry on
    Permissive,
}

impl FromStr for EntryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(EntryPolicy::Strict),
            "permissive" => Ok(EntryPolicy::Permissive),
            other => Err(format!("unknown entry policy '{}'", other)),
        }
    }
}

impl fmt::Display for EntryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPolicy::Strict => write!(f, "strict"),
            EntryPolicy::Permissive => write!(f, "permissive"),
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Treatment of stray tokens inside keyword groups
    pub policy: EntryPolicy,
    /// Upper-case names of groups whose bodies are kept verbatim
    pub freeform_groups: Vec<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            policy: EntryPolicy::Strict,
            freeform_groups: default_freeform_groups(),
        }
    }
}

impl ParserOptions {
    /// Whether `name` is configured as a free-form group.
    pub fn is_freeform(&self, name: &str) -> bool {
        self.freeform_groups
            .iter()
            .any(|g| g.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
struct Token {
    text: String,
    line: usize,
}

#[derive(Debug)]
struct OpenGroup {
    group: Group,
    line: usize,
    buffer: Vec<Token>,
}

#[derive(Debug)]
enum State {
    OutsideGroup,
    InsideGroup(OpenGroup),
}

/// Parser for GAMESS-style input decks.
#[derive(Debug, Clone, Default)]
pub struct InputDeckParser {
    options: ParserOptions,
}

impl InputDeckParser {
    /// Creates a parser with the given options.
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Reads and parses the deck at `path`.
    pub fn parse_file(&self, path: &Path) -> Result<InputDeck> {
        info!("Reading input deck from {}", path.display());
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Parses the full text of one input deck.
    ///
    /// # Errors
    ///
    /// - [`ParseError::UnterminatedGroup`] when input ends inside a group
    /// - [`ParseError::MalformedEntry`] for unclassifiable tokens (strict policy)
    /// - [`ParseError::InvalidGroupName`] for `$` not followed by an identifier
    /// - [`ParseError::UnexpectedEnd`] for `$END` outside a group (strict policy)
    pub fn parse(&self, text: &str) -> Result<InputDeck> {
        let mut deck = InputDeck::default();
        let mut state = State::OutsideGroup;

        for (idx, line) in text.lines().enumerate() {
            if line.trim_start().starts_with('!') {
                deck.push_comment(line);
                continue;
            }
            state = self.scan_line(line, idx + 1, state, &mut deck)?;
        }

        match state {
            State::OutsideGroup => {
                debug!(
                    "Parsed {} groups, {} comments, {} free-form blocks",
                    deck.groups.len(),
                    deck.comments.len(),
                    deck.freeform_blocks.len()
                );
                Ok(deck)
            }
            State::InsideGroup(open) => Err(ParseError::UnterminatedGroup {
                group: open.group.name,
                line: open.line,
            }),
        }
    }

    /// Feeds one non-comment line through the state machine.
    fn scan_line(
        &self,
        line: &str,
        line_no: usize,
        mut state: State,
        deck: &mut InputDeck,
    ) -> Result<State> {
        let mut rest = line;
        // `rest` is still the untouched original line
        let mut whole = true;

        loop {
            state = match state {
                State::OutsideGroup => {
                    let Some(m) = TOKEN_RE.find_iter(rest).find(|m| self.opens_group(m.as_str()))
                    else {
                        if !rest.trim().is_empty() {
                            deck.push_outside_line(if whole { rest } else { rest.trim() });
                        } else if whole {
                            deck.extend_outside_block(rest);
                        }
                        return Ok(State::OutsideGroup);
                    };
                    let prefix = &rest[..m.start()];
                    if !prefix.trim().is_empty() {
                        deck.push_outside_line(if whole { prefix.trim_end() } else { prefix.trim() });
                    }
                    rest = &rest[m.end()..];
                    whole = false;

                    if is_end(m.as_str()) {
                        if self.options.policy == EntryPolicy::Strict {
                            return Err(ParseError::UnexpectedEnd { line: line_no });
                        }
                        warn!("Ignoring $END outside any group at line {}", line_no);
                        State::OutsideGroup
                    } else {
                        State::InsideGroup(self.open_group(m.as_str(), line_no)?)
                    }
                }
                State::InsideGroup(mut open) if open.group.is_freeform() => {
                    let end = TOKEN_RE.find_iter(rest).find(|m| is_end(m.as_str()));
                    let body = match end {
                        Some(m) => &rest[..m.start()],
                        None => rest,
                    };
                    if whole && end.is_none() {
                        open.group.body.push(body.to_string());
                    } else if !body.trim().is_empty() {
                        let text = if whole { body.trim_end() } else { body.trim() };
                        open.group.body.push(text.to_string());
                    }

                    match end {
                        Some(m) => {
                            rest = &rest[m.end()..];
                            whole = false;
                            debug!(
                                "Closed ${} with {} body lines",
                                open.group.name,
                                open.group.body.len()
                            );
                            deck.push_group(open.group);
                            State::OutsideGroup
                        }
                        None => return Ok(State::InsideGroup(open)),
                    }
                }
                State::InsideGroup(mut open) => {
                    let mut closed_at = None;
                    for m in TOKEN_RE.find_iter(rest) {
                        let text = m.as_str();
                        if is_end(text) {
                            closed_at = Some(m.end());
                            break;
                        }
                        if text.starts_with('$') {
                            self.reject(
                                &mut open.group,
                                Token { text: text.to_string(), line: line_no },
                                "group opened before the previous one was closed",
                            )?;
                            continue;
                        }
                        open.buffer.push(Token {
                            text: text.to_string(),
                            line: line_no,
                        });
                    }

                    match closed_at {
                        Some(end) => {
                            rest = &rest[end..];
                            whole = false;
                            let group = self.close_group(open)?;
                            deck.push_group(group);
                            State::OutsideGroup
                        }
                        None => return Ok(State::InsideGroup(open)),
                    }
                }
            };
        }
    }

    /// Whether an outside token starts a group or is a stray `$END`.
    ///
    /// Under the permissive policy a `$` not followed by an identifier is
    /// plain text, e.g. a price in a title line.
    fn opens_group(&self, token: &str) -> bool {
        token.starts_with('$')
            && (self.options.policy == EntryPolicy::Strict
                || is_end(token)
                || GROUP_NAME_RE.is_match(&token[1..]))
    }

    fn open_group(&self, token: &str, line: usize) -> Result<OpenGroup> {
        let name = &token[1..];
        if !GROUP_NAME_RE.is_match(name) {
            return Err(ParseError::InvalidGroupName {
                token: token.to_string(),
                line,
            });
        }
        let group = if self.options.is_freeform(name) {
            Group::freeform(name)
        } else {
            Group::keyword(name)
        };
        debug!("Opened ${} at line {}", group.name, line);
        Ok(OpenGroup {
            group,
            line,
            buffer: Vec::new(),
        })
    }

    /// Turns the buffered tokens of a keyword group into entries.
    fn close_group(&self, open: OpenGroup) -> Result<Group> {
        let OpenGroup {
            mut group, buffer, ..
        } = open;
        // key of the entry an array continuation would extend
        let mut current: Option<(String, Option<usize>)> = None;

        for token in glue_assignments(buffer) {
            let assignment = token
                .text
                .split_once('=')
                .map(|(key, value)| (parse_key(key), value.to_string()));

            if let Some((key, value)) = assignment {
                match key {
                    None => {
                        self.reject(&mut group, token, "key is not an identifier")?;
                        current = None;
                    }
                    Some(_) if value.is_empty() => {
                        self.reject(&mut group, token, "missing value")?;
                        current = None;
                    }
                    Some((name, index)) => {
                        let entry = Entry::new(&name, index, &value);
                        let key = entry.key();
                        if group.insert(entry) {
                            debug!("${} {} given twice; keeping the last value", group.name, key);
                        }
                        current = Some((name, index));
                    }
                }
                continue;
            }

            let continued = match &current {
                Some((name, index)) => match group.entry_mut(name, *index) {
                    Some(entry) if entry.value.ends_with(',') || token.text.starts_with(',') => {
                        entry.value.push(' ');
                        entry.value.push_str(&token.text);
                        true
                    }
                    _ => false,
                },
                None => false,
            };
            if !continued {
                self.reject(&mut group, token, "expected KEY=VALUE")?;
                current = None;
            }
        }

        debug!("Closed ${} with {} entries", group.name, group.entries.len());
        Ok(group)
    }

    fn reject(&self, group: &mut Group, token: Token, reason: &str) -> Result<()> {
        match self.options.policy {
            EntryPolicy::Strict => Err(ParseError::MalformedEntry {
                group: group.name.clone(),
                token: token.text,
                line: token.line,
                reason: reason.to_string(),
            }),
            EntryPolicy::Permissive => {
                warn!(
                    "Keeping unparsed token '{}' in ${} at line {}: {}",
                    token.text, group.name, token.line, reason
                );
                group.unparsed.push(token.text);
                Ok(())
            }
        }
    }
}

fn is_end(token: &str) -> bool {
    token.eq_ignore_ascii_case("$END")
}

/// Splits `KEY` or `KEY(<n>)` into an upper-cased name and optional index.
fn parse_key(key: &str) -> Option<(String, Option<usize>)> {
    let caps = KEY_RE.captures(key)?;
    let index = match caps.get(2) {
        Some(i) => Some(i.as_str().parse().ok()?),
        None => None,
    };
    Some((caps[1].to_ascii_uppercase(), index))
}

/// Joins `KEY = VALUE`, `KEY= VALUE` and `KEY =VALUE` into single tokens,
/// and re-joins quoted values that contain spaces.
fn glue_assignments(tokens: Vec<Token>) -> Vec<Token> {
    let mut glued: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if let Some(prev) = glued.last_mut() {
            if has_open_quote(&prev.text) {
                prev.text.push(' ');
                prev.text.push_str(&token.text);
                continue;
            }
            let dangling = prev.text.ends_with('=') && !token.text.contains('=');
            let leading = token.text.starts_with('=') && !prev.text.contains('=');
            if dangling || leading {
                prev.text.push_str(&token.text);
                continue;
            }
        }
        glued.push(token);
    }
    glued
}

fn has_open_quote(text: &str) -> bool {
    text.matches('\'').count() % 2 == 1 || text.matches('"').count() % 2 == 1
}

/// Parses deck text with default options.
pub fn parse(text: &str) -> Result<InputDeck> {
    InputDeckParser::default().parse(text)
}

/// Reads and parses the deck at `path` with default options.
pub fn parse_file(path: &Path) -> Result<InputDeck> {
    InputDeckParser::default().parse_file(path)
}
