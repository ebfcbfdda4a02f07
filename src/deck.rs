//! In-memory representation of a parsed input deck.
//!
//! An [`InputDeck`] is produced once by [`parser::parse`](crate::parser::parse)
//! and is not mutated afterwards. It keeps three ordered views of the file:
//!
//! - [`InputDeck::groups`]: every `$NAME ... $END` record, in file order
//! - [`InputDeck::comments`]: every `!` comment line, verbatim
//! - [`InputDeck::freeform_blocks`]: text outside keyword records (titles,
//!   divider lines) plus the bodies of free-form groups such as `$DATA`
//!
//! A private layout list remembers how the three views interleave so that
//! [`io::render_deck`](crate::io::render_deck) can reproduce the original order.

use serde::Serialize;
use std::str::FromStr;

/// One `KEY=VALUE` entry of a keyword group.
///
/// # Examples
///
/// ```
/// use gmsdeck::deck::Entry;
///
/// let entry = Entry::new("IZMAT", Some(1), "1,1,2, 1,1,3");
/// assert_eq!(entry.key(), "IZMAT(1)");
/// assert_eq!(entry.elements(), vec!["1", "1", "2", "1", "1", "3"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Upper-cased key name without the index suffix
    pub name: String,
    /// Parsed `(<n>)` index, if the key carried one
    pub index: Option<usize>,
    /// Raw value text; array chunks are joined with single spaces
    pub value: String,
}

impl Entry {
    /// Creates an entry, upper-casing the key name.
    pub fn new(name: &str, index: Option<usize>, value: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            index,
            value: value.to_string(),
        }
    }

    /// Returns the key as written in a deck: `NAME` or `NAME(<n>)`.
    pub fn key(&self) -> String {
        match self.index {
            Some(i) => format!("{}({})", self.name, i),
            None => self.name.clone(),
        }
    }

    /// Splits the raw value into array elements on commas and whitespace.
    pub fn elements(&self) -> Vec<&str> {
        self.value
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect()
    }

    fn matches(&self, name: &str, index: Option<usize>) -> bool {
        self.index == index && self.name.eq_ignore_ascii_case(name)
    }
}

/// One `$NAME ... $END` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Upper-cased group name, never empty
    pub name: String,
    /// Entries in first-occurrence order, unique by key
    pub entries: Vec<Entry>,
    /// Verbatim body lines of a free-form group; empty for keyword groups
    pub body: Vec<String>,
    /// Tokens kept by the permissive policy that were not entries
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unparsed: Vec<String>,
    freeform: bool,
}

impl Group {
    /// Creates an empty keyword group.
    pub fn keyword(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            entries: Vec::new(),
            body: Vec::new(),
            unparsed: Vec::new(),
            freeform: false,
        }
    }

    /// Creates an empty free-form group such as `$DATA`.
    pub fn freeform(name: &str) -> Self {
        Self {
            freeform: true,
            ..Self::keyword(name)
        }
    }

    /// Whether the body of this group is positional text rather than entries.
    pub fn is_freeform(&self) -> bool {
        self.freeform
    }

    /// Inserts an entry. A key seen before keeps its position and takes the new value.
    ///
    /// Returns `true` when an earlier value was overwritten.
    pub fn insert(&mut self, entry: Entry) -> bool {
        match self.entry_mut(&entry.name, entry.index) {
            Some(existing) => {
                existing.value = entry.value;
                true
            }
            None => {
                self.entries.push(entry);
                false
            }
        }
    }

    pub(crate) fn entry_mut(&mut self, name: &str, index: Option<usize>) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.matches(name, index))
    }

    /// Looks up an entry by key, case-insensitively.
    ///
    /// The key may carry an index suffix: `get("izmat(1)")`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gmsdeck::parser::parse;
    ///
    /// let deck = parse(" $CONTRL SCFTYP=RHF RUNTYP=OPTIMIZE $END\n").unwrap();
    /// let contrl = deck.group("contrl").unwrap();
    /// assert_eq!(contrl.get("scftyp").map(|e| e.value.as_str()), Some("RHF"));
    /// ```
    pub fn get(&self, key: &str) -> Option<&Entry> {
        let (name, index) = split_key(key)?;
        self.entries.iter().find(|e| e.matches(name, index))
    }

    /// Raw value of `key`, if present.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.value.as_str())
    }

    /// Parses the value of `key` as `T`.
    ///
    /// Returns `None` when the key is absent and `Some(Err(..))` when the
    /// value does not parse.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<Result<T, T::Err>> {
        self.value(key).map(|v| v.trim().parse::<T>())
    }

    /// Array elements of `key`; empty when the key is absent.
    pub fn values(&self, key: &str) -> Vec<&str> {
        self.get(key).map(Entry::elements).unwrap_or_default()
    }
}

/// Splits `NAME(<n>)` into its parts. Returns `None` for a malformed index.
pub(crate) fn split_key(key: &str) -> Option<(&str, Option<usize>)> {
    let key = key.trim();
    match key.find('(') {
        Some(open) => {
            let inner = key[open + 1..].strip_suffix(')')?;
            let index = inner.trim().parse().ok()?;
            Some((&key[..open], Some(index)))
        }
        None => Some((key, None)),
    }
}

/// A run of consecutive lines kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeformBlock {
    /// Name of the free-form group whose body this is, or `None` for text
    /// outside every group
    pub owner: Option<String>,
    /// Original lines, leading whitespace included
    pub lines: Vec<String>,
}

impl FreeformBlock {
    /// The block as a single newline-joined string.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Position of a piece of the deck in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Comment(usize),
    Group(usize),
    Block(usize),
}

/// Borrowed view of one layout item, see [`InputDeck::items`].
#[derive(Debug, Clone, Copy)]
pub enum DeckItem<'a> {
    /// A `!` comment line
    Comment(&'a str),
    /// A group record
    Group(&'a Group),
    /// Free-form text outside any group
    Block(&'a FreeformBlock),
}

/// The whole parsed deck.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InputDeck {
    /// Groups in file order
    pub groups: Vec<Group>,
    /// Comment lines in file order, verbatim
    pub comments: Vec<String>,
    /// Free-form blocks in file order
    pub freeform_blocks: Vec<FreeformBlock>,
    #[serde(skip)]
    pub(crate) layout: Vec<Slot>,
}

impl InputDeck {
    pub(crate) fn push_comment(&mut self, line: &str) {
        self.layout.push(Slot::Comment(self.comments.len()));
        self.comments.push(line.to_string());
    }

    pub(crate) fn push_group(&mut self, group: Group) {
        if group.is_freeform() {
            self.freeform_blocks.push(FreeformBlock {
                owner: Some(group.name.clone()),
                lines: group.body.clone(),
            });
        }
        self.layout.push(Slot::Group(self.groups.len()));
        self.groups.push(group);
    }

    /// Appends an outside line, extending the previous block when nothing
    /// else came between them.
    pub(crate) fn push_outside_line(&mut self, line: &str) {
        if let Some(Slot::Block(i)) = self.layout.last() {
            self.freeform_blocks[*i].lines.push(line.to_string());
            return;
        }
        self.layout.push(Slot::Block(self.freeform_blocks.len()));
        self.freeform_blocks.push(FreeformBlock {
            owner: None,
            lines: vec![line.to_string()],
        });
    }

    /// Appends a blank outside line to the block in progress, if there is one.
    pub(crate) fn extend_outside_block(&mut self, line: &str) {
        if let Some(Slot::Block(i)) = self.layout.last() {
            self.freeform_blocks[*i].lines.push(line.to_string());
        }
    }

    /// First group with the given name, case-insensitively.
    pub fn group(&self, name: &str) -> Option<&Group> {
        let name = name.trim_start_matches('$');
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }

    /// Every group with the given name, in file order.
    pub fn groups_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Group> + 'a {
        let name = name.trim_start_matches('$');
        self.groups
            .iter()
            .filter(move |g| g.name.eq_ignore_ascii_case(name))
    }

    /// Group names in file order.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    /// Free-form blocks that sit outside every group.
    pub fn outside_blocks(&self) -> impl Iterator<Item = &FreeformBlock> {
        self.freeform_blocks.iter().filter(|b| b.owner.is_none())
    }

    /// Comments, groups and outside blocks in original file order.
    pub fn items(&self) -> impl Iterator<Item = DeckItem<'_>> {
        self.layout.iter().map(move |slot| match *slot {
            Slot::Comment(i) => DeckItem::Comment(&self.comments[i]),
            Slot::Group(i) => DeckItem::Group(&self.groups[i]),
            Slot::Block(i) => DeckItem::Block(&self.freeform_blocks[i]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut group = Group::keyword("contrl");
        assert!(!group.insert(Entry::new("scftyp", None, "RHF")));
        assert!(!group.insert(Entry::new("RUNTYP", None, "ENERGY")));
        assert!(group.insert(Entry::new("SCFTYP", None, "UHF")));

        assert_eq!(group.name, "CONTRL");
        assert_eq!(group.entries.len(), 2);
        assert_eq!(group.entries[0].key(), "SCFTYP");
        assert_eq!(group.entries[0].value, "UHF");
    }

    #[test]
    fn test_indexed_keys_are_distinct() {
        let mut group = Group::keyword("ZMAT");
        group.insert(Entry::new("IZMAT", Some(1), "1,1,2"));
        group.insert(Entry::new("IZMAT", Some(4), "1,2,3"));

        assert_eq!(group.entries.len(), 2);
        assert_eq!(group.value("izmat(4)"), Some("1,2,3"));
        assert!(group.get("IZMAT").is_none());
        assert!(group.get("IZMAT(x)").is_none());
    }

    #[test]
    fn test_get_as() {
        let mut group = Group::keyword("CONTRL");
        group.insert(Entry::new("NZVAR", None, "5"));
        group.insert(Entry::new("MULT", None, "two"));

        assert_eq!(group.get_as::<u32>("nzvar"), Some(Ok(5)));
        assert!(matches!(group.get_as::<u32>("mult"), Some(Err(_))));
        assert!(group.get_as::<u32>("icharg").is_none());
    }

    #[test]
    fn test_outside_lines_merge_into_one_block() {
        let mut deck = InputDeck::default();
        deck.push_outside_line("title");
        deck.push_outside_line("-----");
        deck.push_comment("! note");
        deck.push_outside_line("after");

        assert_eq!(deck.freeform_blocks.len(), 2);
        assert_eq!(deck.freeform_blocks[0].text(), "title\n-----");
        assert_eq!(deck.items().count(), 3);
    }

    #[test]
    fn test_blank_line_extends_open_block_only() {
        let mut deck = InputDeck::default();
        deck.extend_outside_block("");
        assert!(deck.freeform_blocks.is_empty());

        deck.push_outside_line("title");
        deck.extend_outside_block("");
        deck.push_outside_line("subtitle");
        assert_eq!(deck.freeform_blocks.len(), 1);
        assert_eq!(deck.freeform_blocks[0].lines, vec!["title", "", "subtitle"]);
    }
}
