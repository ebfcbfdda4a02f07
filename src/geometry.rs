//! Interpretation of the `$DATA` free-form body.
//!
//! The `$DATA` group of a deck is kept verbatim by the parser. This module
//! reads it the way the chemistry program does:
//!
//! ```text
//!  $DATA
//! Acetylene geometry optimization      <- title
//! DNH      4                           <- point group and axis order
//!                                      <- blank line (non-C1 groups only)
//! C                                    <- atoms, Cartesian or Z-matrix
//! C  1 rCC
//! ...
//!  $END
//! ```
//!
//! - [`DataSection`]: title, [`PointGroup`], units and [`Coordinates`]
//! - [`Geometry`]: element symbols with a flat coordinate vector in Angstroms
//!
//! The coordinate style comes from `$CONTRL COORD=` and the length unit from
//! `$CONTRL UNITS=`; see [`InputDeck::data_section`].

use crate::deck::{Group, InputDeck};
use log::debug;
use nalgebra::DVector;
use serde::Serialize;
use thiserror::Error;

/// Unit conversion constant: Bohr to Angstrom
pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;

/// Element symbols indexed by nuclear charge minus one, hydrogen to radon.
const ELEMENTS: [&str; 86] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn",
];

/// Element symbol for a nuclear charge, e.g. `6.0` -> `"C"`.
pub fn element_symbol(nuclear_charge: f64) -> Option<&'static str> {
    let z = nuclear_charge.round();
    if !z.is_finite() || !(1.0..=ELEMENTS.len() as f64).contains(&z) {
        return None;
    }
    Some(ELEMENTS[z as usize - 1])
}

/// Nuclear charge for an element symbol, case-insensitively.
///
/// ```
/// use gmsdeck::geometry::nuclear_charge;
///
/// assert_eq!(nuclear_charge("c"), Some(6));
/// assert_eq!(nuclear_charge("Cl"), Some(17));
/// assert_eq!(nuclear_charge("Xx"), None);
/// ```
pub fn nuclear_charge(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|e| e.eq_ignore_ascii_case(symbol.trim()))
        .map(|i| i as u32 + 1)
}

/// Errors raised while interpreting a `$DATA` body.
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    /// The deck has no `$DATA` group
    #[error("No $DATA group in deck")]
    MissingData,
    /// The `$DATA` body has no title line
    #[error("$DATA has no title line")]
    MissingTitle,
    /// The `$DATA` body has no point group line
    #[error("$DATA has no point group line")]
    MissingPointGroup,
    /// A record could not be read
    #[error("$DATA record {record}: {details}")]
    Record {
        /// 1-based position of the line within the `$DATA` body
        record: usize,
        /// Description of the problem
        details: String,
    },
    /// A Z-matrix refers to a variable that is never defined
    #[error("Z-matrix variable '{0}' is not defined")]
    UndefinedVariable(String),
    /// Cartesian coordinates were requested from a non-Cartesian section
    #[error("$DATA uses {0} coordinates, not Cartesian")]
    NotCartesian(String),
}

/// Type alias for geometry operation results
type Result<T> = std::result::Result<T, GeometryError>;

/// Coordinate style selected by `$CONTRL COORD=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CoordStyle {
    /// `UNIQUE`, `CART` or `PRINAXIS`: `NAME ZNUC X Y Z` records
    Cartesian,
    /// `ZMT` or `ZMTMPC`: Z-matrix rows followed by variables
    ZMatrix,
    /// Any other style; records are kept as text
    Other(String),
}

impl CoordStyle {
    /// Maps a `COORD=` value, defaulting to Cartesian when absent.
    pub fn from_keyword(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()) {
            None => CoordStyle::Cartesian,
            Some(v) => match v.as_str() {
                "UNIQUE" | "CART" | "PRINAXIS" => CoordStyle::Cartesian,
                "ZMT" | "ZMTMPC" => CoordStyle::ZMatrix,
                _ => CoordStyle::Other(v),
            },
        }
    }
}

/// Length unit selected by `$CONTRL UNITS=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Units {
    /// Angstroms, the default
    #[default]
    Angstrom,
    /// Bohr radii
    Bohr,
}

/// Schoenflies point group from the second `$DATA` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PointGroup {
    /// Upper-cased group label, e.g. `DNH` or `C1`
    pub label: String,
    /// Principal axis order (`NAXIS`), if given
    pub order: Option<u32>,
}

impl PointGroup {
    /// Whether this is the trivial group, which takes no blank line after it.
    pub fn is_c1(&self) -> bool {
        self.label == "C1"
    }
}

/// One Cartesian `$DATA` atom record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataAtom {
    /// Atom label as written
    pub name: String,
    /// Nuclear charge
    pub nuclear_charge: f64,
    /// Position in the deck's length unit
    pub position: [f64; 3],
}

/// One Z-matrix row: a symbol and up to three `(atom, value)` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZMatrixRow {
    /// Element symbol or label
    pub symbol: String,
    /// Bond, angle and dihedral references in order; atom indices are 1-based
    pub refs: Vec<(usize, String)>,
}

/// Z-matrix rows plus variable definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ZMatrix {
    /// Rows in atom order
    pub rows: Vec<ZMatrixRow>,
    /// `name=value` definitions in file order
    pub variables: Vec<(String, f64)>,
}

impl ZMatrix {
    /// Numeric value of a reference field: a literal or a (possibly negated) variable.
    pub fn value(&self, field: &str) -> Result<f64> {
        if let Ok(v) = field.parse::<f64>() {
            return Ok(v);
        }
        let (sign, name) = match field.strip_prefix('-') {
            Some(name) => (-1.0, name),
            None => (1.0, field),
        };
        self.variables
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| sign * v)
            .ok_or_else(|| GeometryError::UndefinedVariable(name.to_string()))
    }

    /// Every row with its references resolved to numbers.
    pub fn resolved(&self) -> Result<Vec<Vec<(usize, f64)>>> {
        self.rows
            .iter()
            .map(|row| {
                row.refs
                    .iter()
                    .map(|(atom, field)| Ok((*atom, self.value(field)?)))
                    .collect()
            })
            .collect()
    }
}

/// Atom records of a `$DATA` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Coordinates {
    /// `NAME ZNUC X Y Z` records
    Cartesian(Vec<DataAtom>),
    /// Z-matrix rows and variables
    ZMatrix(ZMatrix),
    /// Records of an unsupported style, kept as written
    Raw(Vec<String>),
}

/// The interpreted `$DATA` group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSection {
    /// First body line, trimmed
    pub title: String,
    /// Point group from the second body line
    pub point_group: PointGroup,
    /// Length unit of the coordinates
    pub units: Units,
    /// Atom records
    pub coordinates: Coordinates,
}

impl DataSection {
    /// Reads a `$DATA` group body in the given coordinate style.
    pub fn from_group(group: &Group, style: &CoordStyle, units: Units) -> Result<Self> {
        let mut records = group.body.iter().enumerate().map(|(i, l)| (i + 1, l.as_str()));

        let title = records
            .next()
            .map(|(_, l)| l.trim().to_string())
            .ok_or(GeometryError::MissingTitle)?;
        let point_group = records
            .next()
            .and_then(|(_, l)| parse_point_group(l))
            .ok_or(GeometryError::MissingPointGroup)?;

        let mut remaining: Vec<(usize, &str)> = records.collect();
        if !point_group.is_c1() && remaining.first().is_some_and(|(_, l)| l.trim().is_empty()) {
            remaining.remove(0);
        }

        let coordinates = match style {
            CoordStyle::Cartesian => Coordinates::Cartesian(parse_cartesian(&remaining)),
            CoordStyle::ZMatrix => Coordinates::ZMatrix(parse_zmatrix(&remaining)?),
            CoordStyle::Other(_) => Coordinates::Raw(
                remaining
                    .iter()
                    .filter(|(_, l)| !l.trim().is_empty())
                    .map(|(_, l)| l.to_string())
                    .collect(),
            ),
        };

        Ok(Self {
            title,
            point_group,
            units,
            coordinates,
        })
    }

    /// Number of atom records (Z-matrix rows count as atoms).
    pub fn num_atoms(&self) -> usize {
        match &self.coordinates {
            Coordinates::Cartesian(atoms) => atoms.len(),
            Coordinates::ZMatrix(z) => z.rows.len(),
            Coordinates::Raw(lines) => lines.len(),
        }
    }

    /// Cartesian geometry in Angstroms.
    ///
    /// Only the symmetry-unique atoms written in the deck are included.
    pub fn geometry(&self) -> Result<Geometry> {
        let atoms = match &self.coordinates {
            Coordinates::Cartesian(atoms) => atoms,
            Coordinates::ZMatrix(_) => return Err(GeometryError::NotCartesian("Z-matrix".into())),
            Coordinates::Raw(_) => return Err(GeometryError::NotCartesian("unsupported".into())),
        };
        let scale = match self.units {
            Units::Angstrom => 1.0,
            Units::Bohr => BOHR_TO_ANGSTROM,
        };

        let mut elements = Vec::with_capacity(atoms.len());
        let mut coords = Vec::with_capacity(atoms.len() * 3);
        for atom in atoms {
            let symbol = element_symbol(atom.nuclear_charge)
                .map(str::to_string)
                .unwrap_or_else(|| label_symbol(&atom.name));
            elements.push(symbol);
            coords.extend(atom.position.iter().map(|c| c * scale));
        }
        Ok(Geometry::new(elements, coords))
    }
}

fn parse_point_group(line: &str) -> Option<PointGroup> {
    let mut parts = line.split_whitespace();
    let label = parts.next()?.to_ascii_uppercase();
    let order = parts.next().and_then(|s| s.parse().ok());
    Some(PointGroup { label, order })
}

/// Leading alphabetic part of an atom label, e.g. `C1` -> `C`.
fn label_symbol(name: &str) -> String {
    name.chars().take_while(|c| c.is_ascii_alphabetic()).collect()
}

fn parse_cartesian(records: &[(usize, &str)]) -> Vec<DataAtom> {
    let mut atoms = Vec::new();
    for &(record, line) in records {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 || !parts[0].starts_with(|c: char| c.is_ascii_alphabetic()) {
            // blank separators and inline basis shells
            continue;
        }
        let numbers: std::result::Result<Vec<f64>, _> =
            parts[1..5].iter().map(|s| s.parse::<f64>()).collect();
        match numbers {
            Ok(n) => atoms.push(DataAtom {
                name: parts[0].to_string(),
                nuclear_charge: n[0],
                position: [n[1], n[2], n[3]],
            }),
            Err(_) => debug!("Skipping non-atom $DATA record {}: {}", record, line.trim()),
        }
    }
    atoms
}

fn parse_zmatrix(records: &[(usize, &str)]) -> Result<ZMatrix> {
    let mut zmat = ZMatrix::default();
    let mut in_variables = false;

    for &(record, line) in records {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !zmat.rows.is_empty() {
                in_variables = true;
            }
            continue;
        }

        if in_variables || trimmed.contains('=') {
            in_variables = true;
            let (name, value) = match trimmed.split_once('=') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => {
                    let mut parts = trimmed.split_whitespace();
                    (parts.next().unwrap_or(""), parts.next().unwrap_or(""))
                }
            };
            let value = value.parse::<f64>().map_err(|_| GeometryError::Record {
                record,
                details: format!("invalid value for variable '{}'", name),
            })?;
            zmat.variables.push((name.to_string(), value));
            continue;
        }

        let parts: Vec<&str> = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        let row_no = zmat.rows.len() + 1;
        let expected = 1 + 2 * (row_no - 1).min(3);
        if parts.len() < expected {
            return Err(GeometryError::Record {
                record,
                details: format!(
                    "Z-matrix row {} needs {} fields, found {}",
                    row_no,
                    expected,
                    parts.len()
                ),
            });
        }

        let mut refs = Vec::new();
        for pair in parts[1..expected].chunks(2) {
            let atom = pair[0].parse::<usize>().map_err(|_| GeometryError::Record {
                record,
                details: format!("invalid atom reference '{}'", pair[0]),
            })?;
            if atom == 0 || atom >= row_no {
                return Err(GeometryError::Record {
                    record,
                    details: format!("row {} refers to atom {}", row_no, atom),
                });
            }
            refs.push((atom, pair[1].to_string()));
        }
        zmat.rows.push(ZMatrixRow {
            symbol: parts[0].to_string(),
            refs,
        });
    }

    Ok(zmat)
}

impl InputDeck {
    /// Interprets the `$DATA` group using `$CONTRL COORD=` and `UNITS=`.
    pub fn data_section(&self) -> Result<DataSection> {
        let data = self.group("DATA").ok_or(GeometryError::MissingData)?;
        let contrl = self.group("CONTRL");
        let style = CoordStyle::from_keyword(contrl.and_then(|c| c.value("COORD")));
        let units = match contrl.and_then(|c| c.value("UNITS")) {
            Some(u) if u.trim().eq_ignore_ascii_case("BOHR") => Units::Bohr,
            _ => Units::Angstrom,
        };
        DataSection::from_group(data, &style, units)
    }
}

/// Represents a molecular geometry with atomic elements and Cartesian coordinates.
///
/// Coordinates are stored flat as `[x1, y1, z1, x2, y2, z2, ...]` in Angstroms.
///
/// # Examples
///
/// ```
/// use gmsdeck::geometry::Geometry;
///
/// let elements = vec!["O".to_string(), "H".to_string(), "H".to_string()];
/// let coords = vec![0.0, 0.0, 0.0, 0.757, 0.586, 0.0, -0.757, 0.586, 0.0];
///
/// let geometry = Geometry::new(elements, coords);
/// assert_eq!(geometry.num_atoms, 3);
/// assert_eq!(geometry.get_atom_coords(1), [0.757, 0.586, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Chemical element symbols for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates in Angstroms
    pub coords: DVector<f64>,
    /// Number of atoms in the molecule
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a new `Geometry` from element list and coordinate vector.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
        }
    }

    /// Cartesian coordinates `[x, y, z]` of the atom at zero-based `atom_idx`.
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Distance in Angstroms between two atoms.
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        let (pa, pb) = (self.get_atom_coords(a), self.get_atom_coords(b));
        pa.iter()
            .zip(pb.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const WATER: &str = " $CONTRL SCFTYP=RHF $END
 $DATA
Water
C1
O   8.0   0.000   0.000   0.117
H   1.0   0.000   0.757  -0.467
H   1.0   0.000  -0.757  -0.467
 $END
";

    #[test]
    fn test_element_lookup() {
        assert_eq!(element_symbol(8.0), Some("O"));
        assert_eq!(element_symbol(0.0), None);
        assert_eq!(element_symbol(87.0), None);
        assert_eq!(nuclear_charge(" O "), Some(8));
        assert_eq!(element_symbol(f64::NAN), None);
        assert_eq!(element_symbol(f64::INFINITY), None);
    }

    #[test]
    fn test_non_finite_charge_falls_back_to_label() {
        for charge in ["NaN", "inf"] {
            let text = format!(" $DATA\nt\nC1\nXe1 {} 0.0 0.0 0.0\n $END\n", charge);
            let geom = parse(&text).unwrap().data_section().unwrap().geometry().unwrap();
            assert_eq!(geom.elements, vec!["Xe"]);
        }
    }

    #[test]
    fn test_cartesian_data_section() {
        let deck = parse(WATER).unwrap();
        let data = deck.data_section().unwrap();
        assert_eq!(data.title, "Water");
        assert!(data.point_group.is_c1());
        assert_eq!(data.num_atoms(), 3);

        let geom = data.geometry().unwrap();
        assert_eq!(geom.elements, vec!["O", "H", "H"]);
        assert_eq!(geom.get_atom_coords(2), [0.0, -0.757, -0.467]);
        assert!((geom.distance(1, 2) - 1.514).abs() < 1e-9);
    }

    #[test]
    fn test_bohr_units_are_converted() {
        let text = WATER.replace("SCFTYP=RHF", "SCFTYP=RHF UNITS=BOHR");
        let deck = parse(&text).unwrap();
        let geom = deck.data_section().unwrap().geometry().unwrap();
        assert!((geom.get_atom_coords(0)[2] - 0.117 * BOHR_TO_ANGSTROM).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_section_skips_blank_line() {
        let text = " $DATA\nAmmonia\nC3V 3\n\nN 7.0 0.0 0.0 0.1\nH 1.0 0.9 0.0 -0.3\n $END\n";
        let data = parse(text).unwrap().data_section().unwrap();
        assert_eq!(data.point_group.label, "C3V");
        assert_eq!(data.point_group.order, Some(3));
        assert_eq!(data.num_atoms(), 2);
    }

    #[test]
    fn test_inline_basis_lines_are_skipped() {
        let text = " $DATA\nH2\nC1\nH 1.0 0.0 0.0 0.0\n   S 3\n   1 3.42525091 0.15432897\n\nH 1.0 0.0 0.0 0.74\n $END\n";
        let data = parse(text).unwrap().data_section().unwrap();
        assert_eq!(data.num_atoms(), 2);
    }

    #[test]
    fn test_zmatrix_section() {
        let text = " $CONTRL COORD=ZMT $END
 $DATA
Acetylene
DNH 4

C
C 1 rCC
H 1 rCH 2 180.0
H 2 rCH 1 180.0 3 0.0

rCC=1.20
rCH=1.06
 $END
";
        let data = parse(text).unwrap().data_section().unwrap();
        let Coordinates::ZMatrix(zmat) = &data.coordinates else {
            panic!("expected a Z-matrix");
        };
        assert_eq!(zmat.rows.len(), 4);
        assert_eq!(zmat.rows[2].refs, vec![(1, "rCH".to_string()), (2, "180.0".to_string())]);
        assert_eq!(zmat.variables.len(), 2);

        let resolved = zmat.resolved().unwrap();
        assert_eq!(resolved[1], vec![(1, 1.20)]);
        assert_eq!(zmat.value("-rCH").unwrap(), -1.06);
        assert!(matches!(data.geometry(), Err(GeometryError::NotCartesian(_))));
    }

    #[test]
    fn test_zmatrix_bad_reference() {
        let text = " $CONTRL COORD=ZMT $END\n $DATA\nt\nC1\nC\nC 2 1.2\n $END\n";
        let err = parse(text).unwrap().data_section().unwrap_err();
        assert!(matches!(err, GeometryError::Record { record: 4, .. }));
    }

    #[test]
    fn test_undefined_variable() {
        let zmat = ZMatrix {
            rows: vec![
                ZMatrixRow { symbol: "C".into(), refs: vec![] },
                ZMatrixRow { symbol: "O".into(), refs: vec![(1, "rCO".into())] },
            ],
            variables: vec![],
        };
        assert_eq!(
            zmat.resolved().unwrap_err(),
            GeometryError::UndefinedVariable("rCO".into())
        );
    }

    #[test]
    fn test_missing_data_and_title() {
        let deck = parse(" $CONTRL SCFTYP=RHF $END").unwrap();
        assert_eq!(deck.data_section().unwrap_err(), GeometryError::MissingData);

        let deck = parse(" $DATA\n $END").unwrap();
        assert_eq!(deck.data_section().unwrap_err(), GeometryError::MissingTitle);
    }

    #[test]
    fn test_other_coord_style_is_raw() {
        let text = " $CONTRL COORD=HINT $END\n $DATA\nt\nC1\nC 6.0 LC 0.0 0.0 0.0 - O\n $END\n";
        let data = parse(text).unwrap().data_section().unwrap();
        assert_eq!(data.coordinates, Coordinates::Raw(vec!["C 6.0 LC 0.0 0.0 0.0 - O".into()]));
    }
}
