//! Consistency checks over a parsed input deck.
//!
//! The parser only guarantees that a deck is well formed. This module checks
//! that the groups agree with each other the way the chemistry program
//! expects them to, and gives a suggestion for every problem it reports.
//!
//! # Checks
//!
//! - `$DATA` is present
//! - `$CONTRL NZVAR` matches the coordinates defined in `$ZMAT IZMAT`
//! - every linear bend in `IZMAT` has a point in `$LIBE APTS`
//! - `SCFTYP=RHF` is only used for singlets
//! - `SCFTYP`, `RUNTYP`, `COORD` and group names are known

use crate::deck::{Group, InputDeck};
use crate::help;
use log::{debug, warn};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// A group the deck depends on is absent
    MissingGroup,
    /// `$CONTRL`, `$ZMAT` and `$LIBE` disagree about internal coordinates
    InconsistentCoordinates,
    /// A keyword has a value that cannot be used
    InvalidValue,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    fn new(category: ErrorCategory, message: String, suggestion: &str) -> Self {
        Self {
            category,
            message,
            suggestion: Some(suggestion.to_string()),
        }
    }
}

/// Kind of a primitive internal coordinate in `$ZMAT IZMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalKind {
    /// Type 1, two atoms
    Stretch,
    /// Type 2, three atoms
    Bend,
    /// Type 3, four atoms
    Torsion,
    /// Type 4, four atoms
    OutOfPlane,
    /// Type 5, three atoms; needs a `$LIBE` point
    LinearBend,
    /// Type 6, five atoms
    DihedralAngle,
    /// Type 7, six atoms
    GhostTorsion,
}

impl InternalKind {
    /// Maps an `IZMAT` type code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Stretch),
            2 => Some(Self::Bend),
            3 => Some(Self::Torsion),
            4 => Some(Self::OutOfPlane),
            5 => Some(Self::LinearBend),
            6 => Some(Self::DihedralAngle),
            7 => Some(Self::GhostTorsion),
            _ => None,
        }
    }

    /// Number of atom indices that follow the type code.
    pub fn atom_count(self) -> usize {
        match self {
            Self::Stretch => 2,
            Self::Bend | Self::LinearBend => 3,
            Self::Torsion | Self::OutOfPlane => 4,
            Self::DihedralAngle => 5,
            Self::GhostTorsion => 6,
        }
    }
}

/// One decoded `IZMAT` coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalCoordinate {
    /// Coordinate kind
    pub kind: InternalKind,
    /// 1-based atom indices
    pub atoms: Vec<usize>,
}

/// Decodes the `IZMAT` arrays of a `$ZMAT` group.
///
/// Each entry writes its elements into one array starting at its index
/// (`IZMAT` alone starts at 1), later entries overwriting earlier ones.
/// Elements left unset between two writes are an error.
///
/// # Examples
///
/// ```
/// use gmsdeck::parser::parse;
/// use gmsdeck::validation::{decode_izmat, InternalKind};
///
/// let deck = parse(" $ZMAT IZMAT(1)=1,1,2, 5,3,1,2 $END").unwrap();
/// let coords = decode_izmat(deck.group("ZMAT").unwrap()).unwrap();
/// assert_eq!(coords.len(), 2);
/// assert_eq!(coords[1].kind, InternalKind::LinearBend);
/// assert_eq!(coords[1].atoms, vec![3, 1, 2]);
/// ```
pub fn decode_izmat(zmat: &Group) -> ValidationResult<Vec<InternalCoordinate>> {
    let mut slots: Vec<Option<u32>> = Vec::new();
    for entry in zmat.entries.iter().filter(|e| e.name == "IZMAT") {
        let start = match entry.index {
            None => 0,
            Some(0) => {
                return Err(ValidationError::new(
                    ErrorCategory::InvalidValue,
                    format!("{}: array indices start at 1", entry.key()),
                    "Write the first IZMAT element as IZMAT(1)",
                ))
            }
            Some(i) => i - 1,
        };
        for (offset, element) in entry.elements().into_iter().enumerate() {
            let n = element.parse::<u32>().map_err(|_| {
                ValidationError::new(
                    ErrorCategory::InvalidValue,
                    format!("{}: '{}' is not a positive integer", entry.key(), element),
                    "IZMAT holds only type codes and atom indices",
                )
            })?;
            let at = start + offset;
            if slots.len() <= at {
                slots.resize(at + 1, None);
            }
            slots[at] = Some(n);
        }
    }

    let numbers = slots
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            n.ok_or_else(|| {
                ValidationError::new(
                    ErrorCategory::InconsistentCoordinates,
                    format!("IZMAT element {} is never set", i + 1),
                    "Check the (n) indices of the IZMAT pieces for a gap",
                )
            })
        })
        .collect::<ValidationResult<Vec<u32>>>()?;

    let mut coords = Vec::new();
    let mut rest = numbers.as_slice();
    while let Some((&code, tail)) = rest.split_first() {
        let kind = InternalKind::from_code(code).ok_or_else(|| {
            ValidationError::new(
                ErrorCategory::InconsistentCoordinates,
                format!(
                    "IZMAT coordinate {} has unknown type {}",
                    coords.len() + 1,
                    code
                ),
                "Valid types are 1 (stretch) through 7 (ghost torsion)",
            )
        })?;
        if tail.len() < kind.atom_count() {
            return Err(ValidationError::new(
                ErrorCategory::InconsistentCoordinates,
                format!(
                    "IZMAT coordinate {} of type {} needs {} atoms, found {}",
                    coords.len() + 1,
                    code,
                    kind.atom_count(),
                    tail.len()
                ),
                "Check for a missing or extra comma in IZMAT",
            ));
        }
        let (atoms, tail) = tail.split_at(kind.atom_count());
        coords.push(InternalCoordinate {
            kind,
            atoms: atoms.iter().map(|&a| a as usize).collect(),
        });
        rest = tail;
    }

    Ok(coords)
}

/// Validates a parsed deck.
///
/// Returns the list of warnings when the deck is usable, or the first error.
/// Warnings are also logged.
///
/// # Examples
///
/// ```
/// use gmsdeck::parser::parse;
/// use gmsdeck::validation::{validate_deck, ErrorCategory};
///
/// let deck = parse(" $CONTRL SCFTYP=RHF $END").unwrap();
/// let err = validate_deck(&deck).unwrap_err();
/// assert_eq!(err.category, ErrorCategory::MissingGroup);
/// ```
pub fn validate_deck(deck: &InputDeck) -> ValidationResult<Vec<String>> {
    let mut warnings = Vec::new();

    if deck.group("DATA").is_none() {
        return Err(ValidationError::new(
            ErrorCategory::MissingGroup,
            "Deck has no $DATA group".to_string(),
            "Add a $DATA group with a title, the point group and the atoms",
        ));
    }

    check_group_names(deck, &mut warnings);
    if let Some(contrl) = deck.group("CONTRL") {
        check_contrl(contrl, &mut warnings)?;
    }
    check_internal_coordinates(deck, &mut warnings)?;

    for warning in &warnings {
        warn!("{}", warning);
    }
    debug!("Validated deck with {} warning(s)", warnings.len());
    Ok(warnings)
}

fn check_group_names(deck: &InputDeck, warnings: &mut Vec<String>) {
    for group in &deck.groups {
        if help::group_info(&group.name).is_none() {
            warnings.push(format!("Unknown group ${}", group.name));
        }
    }
}

fn check_contrl(contrl: &Group, warnings: &mut Vec<String>) -> ValidationResult<()> {
    for key in ["SCFTYP", "RUNTYP", "COORD"] {
        let (Some(value), Some(doc)) = (contrl.value(key), help::keyword_info("CONTRL", key)) else {
            continue;
        };
        if !doc.choices.iter().any(|c| c.eq_ignore_ascii_case(value.trim())) {
            warnings.push(format!("Unknown {} value '{}'", key, value));
        }
    }

    let mult = match contrl.get_as::<u32>("MULT") {
        None => 1,
        Some(Ok(m)) => m,
        Some(Err(_)) => {
            return Err(ValidationError::new(
                ErrorCategory::InvalidValue,
                format!("MULT must be a positive integer, found '{}'", contrl.value("MULT").unwrap_or("")),
                "Set MULT to the spin multiplicity, e.g. MULT=1",
            ))
        }
    };
    let scftyp = contrl.value("SCFTYP").unwrap_or("RHF");
    if scftyp.trim().eq_ignore_ascii_case("RHF") && mult > 1 {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            format!("SCFTYP=RHF cannot describe multiplicity {}", mult),
            "Use SCFTYP=ROHF or SCFTYP=UHF for open-shell states",
        ));
    }
    Ok(())
}

fn check_internal_coordinates(deck: &InputDeck, warnings: &mut Vec<String>) -> ValidationResult<()> {
    let nzvar = match deck.group("CONTRL").and_then(|c| c.get_as::<usize>("NZVAR")) {
        None => 0,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            return Err(ValidationError::new(
                ErrorCategory::InvalidValue,
                "NZVAR must be a non-negative integer".to_string(),
                "Set NZVAR to the number of internal coordinates, or 0 for Cartesians",
            ))
        }
    };
    if nzvar == 0 {
        return Ok(());
    }

    let zmat = deck.group("ZMAT").ok_or_else(|| {
        ValidationError::new(
            ErrorCategory::MissingGroup,
            format!("NZVAR={} requires a $ZMAT group", nzvar),
            "Define the coordinates with $ZMAT IZMAT, or request DLC=.TRUE. AUTO=.TRUE.",
        )
    })?;

    let coords = decode_izmat(zmat)?;
    if coords.is_empty() {
        if zmat.get("DLC").is_some() || zmat.get("AUTO").is_some() {
            return Ok(());
        }
        return Err(ValidationError::new(
            ErrorCategory::MissingGroup,
            "$ZMAT defines no coordinates".to_string(),
            "Give IZMAT, or set DLC=.TRUE. AUTO=.TRUE. to generate them",
        ));
    }

    if coords.len() != nzvar {
        return Err(ValidationError::new(
            ErrorCategory::InconsistentCoordinates,
            format!(
                "NZVAR={} but $ZMAT IZMAT defines {} coordinates",
                nzvar,
                coords.len()
            ),
            "Make NZVAR equal to the number of IZMAT coordinates",
        ));
    }

    let linear_bends = coords
        .iter()
        .filter(|c| c.kind == InternalKind::LinearBend)
        .count();
    if linear_bends > 0 {
        let points = deck.group("LIBE").map_or(0, |libe| {
            libe.entries
                .iter()
                .filter(|e| e.name == "APTS")
                .map(|e| e.elements().len())
                .sum()
        });
        if points != 3 * linear_bends {
            warnings.push(format!(
                "{} linear bend(s) need {} $LIBE APTS values, found {}",
                linear_bends,
                3 * linear_bends,
                points
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const DATA: &str = " $DATA\nt\nC1\nH 1.0 0.0 0.0 0.0\n $END\n";

    fn deck(groups: &str) -> InputDeck {
        parse(&format!("{}{}", groups, DATA)).unwrap()
    }

    #[test]
    fn test_minimal_deck_is_valid() {
        let warnings = validate_deck(&deck(" $CONTRL SCFTYP=RHF RUNTYP=ENERGY $END\n")).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_data() {
        let deck = parse(" $CONTRL SCFTYP=RHF $END\n").unwrap();
        let err = validate_deck(&deck).unwrap_err();
        assert_eq!(err.category, ErrorCategory::MissingGroup);
        assert!(err.to_string().contains("Suggestion:"));
    }

    #[test]
    fn test_rhf_open_shell_is_rejected() {
        let err = validate_deck(&deck(" $CONTRL MULT=3 $END\n")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::InvalidValue);

        assert!(validate_deck(&deck(" $CONTRL SCFTYP=UHF MULT=3 $END\n")).is_ok());
    }

    #[test]
    fn test_unknown_values_warn() {
        let warnings =
            validate_deck(&deck(" $CONTRL SCFTYP=XHF RUNTYP=energy $END\n $FOO A=1 $END\n")).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("$FOO")));
        assert!(warnings.iter().any(|w| w.contains("SCFTYP")));
    }

    #[test]
    fn test_nzvar_needs_zmat() {
        let err = validate_deck(&deck(" $CONTRL NZVAR=3 $END\n")).unwrap_err();
        assert_eq!(err.category, ErrorCategory::MissingGroup);

        assert!(validate_deck(&deck(" $CONTRL NZVAR=3 $END\n $ZMAT DLC=.TRUE. AUTO=.TRUE. $END\n")).is_ok());
    }

    #[test]
    fn test_nzvar_count_mismatch() {
        let err = validate_deck(&deck(" $CONTRL NZVAR=3 $END\n $ZMAT IZMAT(1)=1,1,2, 2,1,2,3 $END\n"))
            .unwrap_err();
        assert_eq!(err.category, ErrorCategory::InconsistentCoordinates);
    }

    #[test]
    fn test_decode_izmat_incomplete_and_unknown() {
        let deck = parse(" $ZMAT IZMAT(1)=1,1,2, 3,1,2,3 $END").unwrap();
        let err = decode_izmat(deck.group("ZMAT").unwrap()).unwrap_err();
        assert!(err.message.contains("needs 4 atoms, found 3"));

        let deck = parse(" $ZMAT IZMAT(1)=9,1,2 $END").unwrap();
        let err = decode_izmat(deck.group("ZMAT").unwrap()).unwrap_err();
        assert!(err.message.contains("unknown type 9"));
    }

    #[test]
    fn test_decode_izmat_indexed_pieces() {
        let deck = parse(" $ZMAT IZMAT(4)=2,1,2,3 IZMAT(1)=1,1,2 $END").unwrap();
        let coords = decode_izmat(deck.group("ZMAT").unwrap()).unwrap();
        assert_eq!(coords[0].kind, InternalKind::Stretch);
        assert_eq!(coords[1].kind, InternalKind::Bend);
    }

    #[test]
    fn test_decode_izmat_overlapping_write() {
        let deck = parse(" $ZMAT IZMAT(1)=1,1,2, 1,1,3 IZMAT(4)=1,2,4 $END").unwrap();
        let coords = decode_izmat(deck.group("ZMAT").unwrap()).unwrap();
        assert_eq!(coords.len(), 2);
        assert_eq!(coords[1].atoms, vec![2, 4]);
    }

    #[test]
    fn test_decode_izmat_gap() {
        let gapped = parse(" $ZMAT IZMAT(1)=1,1,2 IZMAT(7)=1,2,4 $END").unwrap();
        let err = decode_izmat(gapped.group("ZMAT").unwrap()).unwrap_err();
        assert_eq!(err.category, ErrorCategory::InconsistentCoordinates);
        assert!(err.message.contains("element 4"));

        let groups = " $CONTRL NZVAR=2 $END\n $ZMAT IZMAT(1)=1,1,2 IZMAT(7)=1,2,4 $END\n";
        assert!(validate_deck(&deck(groups)).is_err());
    }

    #[test]
    fn test_linear_bend_points() {
        let groups = " $CONTRL NZVAR=2 $END\n $ZMAT IZMAT(1)=1,1,2, 5,3,1,2 $END\n";
        let warnings = validate_deck(&deck(groups)).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("found 0"));

        let groups = format!("{} $LIBE APTS(1)=1.0,0.0,0.0 $END\n", groups);
        assert!(validate_deck(&deck(&groups)).unwrap().is_empty());
    }
}
