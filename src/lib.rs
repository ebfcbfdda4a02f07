#![deny(missing_docs)]

//! gmsdeck - GAMESS Input Deck Parser
//!
//! gmsdeck reads the free-format input decks used by GAMESS-style quantum
//! chemistry programs into an ordered, immutable structure, and provides
//! tools built on that structure: consistency checks, canonical re-rendering,
//! geometry extraction, JSON export and template generation.
//!
//! # Overview
//!
//! An input deck is a sequence of `$NAME ... $END` records (groups), `!`
//! comment lines, and free text:
//!
//! ```text
//! ! RHF/6-31G(d) optimization of acetylene
//!  $CONTRL SCFTYP=RHF RUNTYP=OPTIMIZE COORD=ZMT NZVAR=5 $END
//!  $ZMAT   IZMAT(1)=1,1,2,  1,1,3,  1,2,4,
//!                 5,3,1,2,  5,1,2,4  $END
//!  $DATA
//! Acetylene
//! DNH      4
//!
//! C
//! C  1 rCC
//! ...
//!  $END
//! ```
//!
//! Parsing keeps the order of groups, entries, comments and free text, so a
//! deck can be written back out in the order it was read.
//!
//! # Quick Start
//!
//! ```no_run
//! use gmsdeck::parser::parse_file;
//! use gmsdeck::validation::validate_deck;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let deck = parse_file(Path::new("acetylene.inp"))?;
//!     println!("groups: {:?}", deck.group_names());
//!
//!     let contrl = deck.group("CONTRL").ok_or("no $CONTRL")?;
//!     println!("NZVAR = {:?}", contrl.value("NZVAR"));
//!
//!     for warning in validate_deck(&deck)? {
//!         println!("warning: {}", warning);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`parser`](parser/index.html) - Deck text to [`InputDeck`]
//! - [`deck`](deck/index.html) - Groups, entries, comments and free-form blocks
//! - [`geometry`](geometry/index.html) - Interpretation of the `$DATA` group
//! - [`validation`](validation/index.html) - Cross-group consistency checks
//! - [`io`](io/index.html) - Deck, JSON and XYZ output
//! - [`settings`](settings/index.html) - Configuration files
//! - [`template_generator`](template_generator/index.html) - Decks from geometry files
//! - [`help`](help/index.html) - Built-in keyword reference

pub mod deck;
pub mod geometry;
/// Built-in help system
pub mod help;
pub mod io;
pub mod parser;
/// Configuration management system
pub mod settings;
/// Deck templates from geometry files
pub mod template_generator;
pub mod validation;

pub use deck::{Entry, FreeformBlock, Group, InputDeck};
pub use geometry::Geometry;
pub use parser::{parse, parse_file, EntryPolicy, InputDeckParser, ParseError, ParserOptions};
