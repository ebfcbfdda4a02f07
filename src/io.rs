//! Writing decks and geometries back to disk.
//!
//! - [`render_deck`] / [`write_deck`]: deck text in original item order
//! - [`deck_to_json`]: serde JSON export of the parsed structure
//! - [`write_xyz`]: XYZ file from a [`Geometry`]

use crate::deck::{DeckItem, Group, InputDeck};
use crate::geometry::Geometry;
use std::fs;
use std::io::Result;
use std::path::Path;

/// Column past which keyword groups are wrapped. GAMESS reads 80 columns.
pub const WRAP_COLUMN: usize = 72;

/// Renders a deck as GAMESS input text.
///
/// Comments, outside text and groups come out in the order they were read.
/// Keyword groups are rewritten as ` $NAME KEY=VALUE ... $END`, wrapped
/// before [`WRAP_COLUMN`]; free-form group bodies and outside text are
/// emitted exactly as parsed.
///
/// # Examples
///
/// ```
/// use gmsdeck::io::render_deck;
/// use gmsdeck::parser::parse;
///
/// let deck = parse("!  note\n $contrl scftyp=rhf   runtyp=energy $end\n").unwrap();
/// assert_eq!(render_deck(&deck), "!  note\n $CONTRL SCFTYP=rhf RUNTYP=energy $END\n");
/// ```
pub fn render_deck(deck: &InputDeck) -> String {
    let mut out = String::new();
    for item in deck.items() {
        match item {
            DeckItem::Comment(line) => {
                out.push_str(line);
                out.push('\n');
            }
            DeckItem::Block(block) => {
                for line in &block.lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            DeckItem::Group(group) => out.push_str(&render_group(group)),
        }
    }
    out
}

/// Renders a single group, terminated by a newline.
pub fn render_group(group: &Group) -> String {
    if group.is_freeform() {
        let mut out = format!(" ${}\n", group.name);
        for line in &group.body {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(" $END\n");
        return out;
    }

    let head = format!(" ${}", group.name);
    let indent = " ".repeat(head.len() + 1);

    let words = group
        .entries
        .iter()
        .flat_map(|e| {
            let assignment = format!("{}={}", e.key(), e.value);
            assignment
                .split(' ')
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .chain(group.unparsed.iter().cloned())
        .chain(std::iter::once("$END".to_string()));

    let mut lines = Vec::new();
    let mut current = head;
    let mut fresh = true;
    for word in words {
        if !fresh && current.len() + 1 + word.len() > WRAP_COLUMN {
            lines.push(std::mem::replace(&mut current, format!("{}{}", indent, word)));
        } else {
            current.push(' ');
            current.push_str(&word);
        }
        fresh = false;
    }
    lines.push(current);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Writes the rendered deck to `path`.
pub fn write_deck(deck: &InputDeck, path: &Path) -> Result<()> {
    fs::write(path, render_deck(deck))
}

/// Serializes the parsed deck as pretty-printed JSON.
pub fn deck_to_json(deck: &InputDeck) -> serde_json::Result<String> {
    serde_json::to_string_pretty(deck)
}

/// Writes a molecular geometry to an XYZ file.
///
/// The XYZ format consists of:
/// 1. Number of atoms
/// 2. A comment line
/// 3. Lines for each atom: Element X Y Z
///
/// # Examples
///
/// ```
/// use gmsdeck::geometry::Geometry;
/// use gmsdeck::io;
/// use std::path::Path;
///
/// fn main() -> std::io::Result<()> {
///     let elements = vec!["C".to_string(), "H".to_string()];
///     let coords = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0];
///     let geometry = Geometry::new(elements, coords);
///
///     io::write_xyz(&geometry, Path::new("molecule.xyz"), "CH fragment")?;
///     std::fs::remove_file("molecule.xyz")?;
///     Ok(())
/// }
/// ```
pub fn write_xyz(geom: &Geometry, path: &Path, comment: &str) -> Result<()> {
    let mut content = format!("{}\n{}\n", geom.num_atoms, comment.trim());

    for i in 0..geom.num_atoms {
        let coords = geom.get_atom_coords(i);
        content.push_str(&format!(
            "{}  {:.8}  {:.8}  {:.8}\n",
            geom.elements[i], coords[0], coords[1], coords[2]
        ));
    }

    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use tempfile::TempDir;

    #[test]
    fn test_render_freeform_group_verbatim() {
        let text = " $DATA\nWater\nC1\nO   8.0   0.0  0.0  0.0\n $END\n";
        let deck = parse(text).unwrap();
        assert_eq!(render_deck(&deck), text);
    }

    #[test]
    fn test_render_wraps_long_arrays() {
        let text = " $ZMAT IZMAT(1)=1,1,2, 1,1,3, 1,2,4, 1,3,5, 1,4,6, 2,2,1,3, 2,1,2,4, 2,1,3,5, 2,2,4,6 $END\n";
        let deck = parse(text).unwrap();
        let rendered = render_deck(&deck);

        assert!(rendered.lines().count() > 1);
        assert!(rendered.lines().all(|l| l.len() <= WRAP_COLUMN));
        let again = parse(&rendered).unwrap();
        assert_eq!(again.groups, deck.groups);
    }

    #[test]
    fn test_render_keeps_item_order() {
        let text = "! first\nTitle\n $SYSTEM TIMLIM=1 $END\n! second\n $GUESS GUESS=HUCKEL $END\n";
        let deck = parse(text).unwrap();
        assert_eq!(render_deck(&deck), text);
    }

    #[test]
    fn test_deck_to_json() {
        let deck = parse(" $CONTRL SCFTYP=RHF $END").unwrap();
        let json = deck_to_json(&deck).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["groups"][0]["name"], "CONTRL");
        assert_eq!(value["groups"][0]["entries"][0]["value"], "RHF");
        assert!(value.get("layout").is_none());
    }

    #[test]
    fn test_write_deck_and_xyz() {
        let dir = TempDir::new().unwrap();
        let deck = parse(" $BASIS GBASIS=N31 NGAUSS=6 $END\n").unwrap();
        let deck_path = dir.path().join("out.inp");
        write_deck(&deck, &deck_path).unwrap();
        assert_eq!(
            fs::read_to_string(&deck_path).unwrap(),
            " $BASIS GBASIS=N31 NGAUSS=6 $END\n"
        );

        let geom = Geometry::new(vec!["H".into(), "H".into()], vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.74]);
        let xyz_path = dir.path().join("h2.xyz");
        write_xyz(&geom, &xyz_path, "hydrogen").unwrap();
        let content = fs::read_to_string(&xyz_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "2");
        assert_eq!(lines[1], "hydrogen");
        assert_eq!(lines[3], "H  0.00000000  0.00000000  0.74000000");
    }
}
