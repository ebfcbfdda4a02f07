//! Template generator for creating input decks from geometry files
//!
//! Supports `.xyz` and Gaussian `.gjf` files. The generated deck uses C1
//! symmetry with Cartesian coordinates, so it runs without any knowledge of
//! the molecule's point group.

use crate::deck::{Entry, Group, InputDeck};
use crate::geometry::{element_symbol, nuclear_charge};
use crate::io::render_deck;
use crate::settings::TemplateSettings;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Molecule read from a geometry file.
#[derive(Debug, Clone, PartialEq)]
struct Molecule {
    title: String,
    charge: i32,
    mult: u32,
    elements: Vec<String>,
    coords: Vec<f64>,
}

/// Generate deck text from a geometry file
pub fn generate_template_from_file<P: AsRef<Path>>(
    geometry_file: P,
    settings: &TemplateSettings,
) -> Result<String, Box<dyn std::error::Error>> {
    let geometry_file = geometry_file.as_ref();

    if !geometry_file.exists() {
        return Err(format!("File not found: {}", geometry_file.display()).into());
    }

    let extension = geometry_file
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let content = fs::read_to_string(geometry_file)?;
    let molecule = match extension.to_lowercase().as_str() {
        "xyz" => extract_geometry_from_xyz(&content)?,
        "gjf" => extract_geometry_from_gjf(&content)?,
        _ => return Err(format!("Unsupported file format: {}", extension).into()),
    };

    info!(
        "Read {} atoms from {}",
        molecule.elements.len(),
        geometry_file.display()
    );
    generate_template(&molecule, settings)
}

/// Extract geometry from XYZ file
fn extract_geometry_from_xyz(content: &str) -> Result<Molecule, Box<dyn std::error::Error>> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.len() < 3 {
        return Err("Invalid XYZ file: not enough lines".into());
    }

    let num_atoms = lines[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| "Invalid XYZ file: cannot parse number of atoms")?;

    let mut elements = Vec::new();
    let mut coords = Vec::new();

    for i in 2..2 + num_atoms {
        if i >= lines.len() {
            return Err("Invalid XYZ file: incomplete geometry".into());
        }

        let parts: Vec<&str> = lines[i].split_whitespace().collect();
        if parts.len() < 4 {
            return Err("Invalid XYZ file: malformed coordinate line".into());
        }

        elements.push(parts[0].to_string());
        coords.push(parts[1].parse::<f64>()?);
        coords.push(parts[2].parse::<f64>()?);
        coords.push(parts[3].parse::<f64>()?);
    }

    let title = match lines[1].trim() {
        "" => "Generated by gmsdeck".to_string(),
        comment => comment.to_string(),
    };

    Ok(Molecule {
        title,
        charge: 0,
        mult: 1,
        elements,
        coords,
    })
}

/// Extract geometry, title, charge and multiplicity from a Gaussian .gjf file
fn extract_geometry_from_gjf(content: &str) -> Result<Molecule, Box<dyn std::error::Error>> {
    let mut title = String::new();
    let mut charge_mult = None;
    let mut elements = Vec::new();
    let mut coords = Vec::new();

    // State machine: 0=header, 1=title, 2=charge_mult, 3=geometry
    let mut state = 0;

    for line in content.lines() {
        let trimmed = line.trim();

        match state {
            0 => {
                if trimmed.is_empty() {
                    state = 1;
                }
            }
            1 => {
                if trimmed.is_empty() {
                    state = 2;
                } else {
                    if !title.is_empty() {
                        title.push(' ');
                    }
                    title.push_str(trimmed);
                }
            }
            2 => {
                if !trimmed.is_empty() {
                    let parts: Vec<&str> = trimmed.split_whitespace().collect();
                    if parts.len() < 2 {
                        return Err("Invalid gjf file: malformed charge/multiplicity line".into());
                    }
                    charge_mult = Some((parts[0].parse::<i32>()?, parts[1].parse::<u32>()?));
                    state = 3;
                }
            }
            3 => {
                if trimmed.is_empty() {
                    break;
                }

                let parts: Vec<&str> = trimmed.split_whitespace().collect();
                if parts.len() >= 4 {
                    elements.push(parts[0].to_string());
                    coords.push(parts[1].parse::<f64>()?);
                    coords.push(parts[2].parse::<f64>()?);
                    coords.push(parts[3].parse::<f64>()?);
                }
            }
            _ => {}
        }
    }

    let (charge, mult) = charge_mult.ok_or("Could not find charge and multiplicity in gjf file")?;
    if elements.is_empty() {
        return Err("Could not find geometry in gjf file".into());
    }
    if title.is_empty() {
        title = "Generated by gmsdeck".to_string();
    }

    Ok(Molecule {
        title,
        charge,
        mult,
        elements,
        coords,
    })
}

/// Element symbol and nuclear charge for an atom label such as `C`, `cl2`,
/// `C(Fragment=1)` or an atomic number.
fn resolve_atom(label: &str) -> Option<(String, u32)> {
    if let Ok(z) = label.parse::<u32>() {
        return element_symbol(z as f64).map(|s| (s.to_string(), z));
    }
    let symbol: String = label.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let z = nuclear_charge(&symbol)?;
    let symbol = element_symbol(z as f64)?.to_string();
    Some((symbol, z))
}

fn keyword_group(name: &str, entries: &[(&str, String)]) -> Group {
    let mut group = Group::keyword(name);
    for (key, value) in entries {
        group.insert(Entry::new(key, None, value));
    }
    group
}

/// Build the deck for a molecule and render it
fn generate_template(
    molecule: &Molecule,
    settings: &TemplateSettings,
) -> Result<String, Box<dyn std::error::Error>> {
    let mut scftyp = settings.scftyp.clone();
    if molecule.mult > 1 && scftyp == "RHF" {
        info!(
            "Multiplicity {} needs an open-shell wavefunction, using SCFTYP=UHF",
            molecule.mult
        );
        scftyp = "UHF".to_string();
    }

    let mut deck = InputDeck::default();
    deck.push_comment(&format!("! {}", molecule.title));
    deck.push_group(keyword_group(
        "CONTRL",
        &[
            ("SCFTYP", scftyp),
            ("RUNTYP", settings.runtyp.clone()),
            ("ICHARG", molecule.charge.to_string()),
            ("MULT", molecule.mult.to_string()),
        ],
    ));
    deck.push_group(keyword_group(
        "SYSTEM",
        &[("TIMLIM", "2880".to_string()), ("MWORDS", "100".to_string())],
    ));
    deck.push_group(keyword_group(
        "BASIS",
        &[
            ("GBASIS", settings.gbasis.clone()),
            ("NGAUSS", settings.ngauss.to_string()),
            ("NDFUNC", settings.ndfunc.to_string()),
        ],
    ));
    deck.push_group(keyword_group("GUESS", &[("GUESS", "HUCKEL".to_string())]));
    deck.push_group(keyword_group(
        "STATPT",
        &[("OPTTOL", "0.0001".to_string()), ("NSTEP", "100".to_string())],
    ));

    let mut data = Group::freeform("DATA");
    data.body.push(molecule.title.clone());
    data.body.push("C1".to_string());
    for (i, label) in molecule.elements.iter().enumerate() {
        let (symbol, z) =
            resolve_atom(label).ok_or_else(|| format!("Unknown element '{}'", label))?;
        let xyz = &molecule.coords[i * 3..i * 3 + 3];
        data.body.push(format!(
            "{:<4}{:>6.1}{:>16.8}{:>16.8}{:>16.8}",
            symbol, z as f64, xyz[0], xyz[1], xyz[2]
        ));
    }
    deck.push_group(data);

    Ok(render_deck(&deck))
}

/// Write template to file
pub fn write_template_to_file<P: AsRef<Path>>(
    template: &str,
    output_path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let output_path = output_path.as_ref();

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path, template)?;
    Ok(())
}

/// Get default output filename based on input geometry file
pub fn get_default_output_path<P: AsRef<Path>>(geometry_file: P) -> PathBuf {
    let geometry_file = geometry_file.as_ref();
    let stem = geometry_file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");

    PathBuf::from(format!("{}.inp", stem))
}

/// Validate file extension
pub fn is_supported_format(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "xyz" | "gjf"),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::validation::validate_deck;
    use tempfile::TempDir;

    const WATER_XYZ: &str = "3
water
O   0.000000   0.000000   0.117300
H   0.000000   0.757200  -0.469200
H   0.000000  -0.757200  -0.469200
";

    const TRIPLET_GJF: &str = "%chk=o2.chk
# ub3lyp/6-31g(d) opt

Oxygen triplet

0 3
O   0.0   0.0   0.0
8   0.0   0.0   1.21

";

    #[test]
    fn test_is_supported_format() {
        assert!(is_supported_format(Path::new("test.xyz")));
        assert!(is_supported_format(Path::new("test.GJF")));
        assert!(!is_supported_format(Path::new("test.log")));
        assert!(!is_supported_format(Path::new("test")));
    }

    #[test]
    fn test_get_default_output_path() {
        let path = get_default_output_path(Path::new("molecule.xyz"));
        assert_eq!(path.to_str().unwrap(), "molecule.inp");

        let path = get_default_output_path(Path::new("/path/to/molecule.xyz"));
        assert_eq!(path.to_str().unwrap(), "molecule.inp");
    }

    #[test]
    fn test_resolve_atom() {
        assert_eq!(resolve_atom("cl2"), Some(("Cl".to_string(), 17)));
        assert_eq!(resolve_atom("C(Fragment=1)"), Some(("C".to_string(), 6)));
        assert_eq!(resolve_atom("8"), Some(("O".to_string(), 8)));
        assert_eq!(resolve_atom("Xx"), None);
    }

    #[test]
    fn test_xyz_template_parses_and_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("water.xyz");
        fs::write(&path, WATER_XYZ).unwrap();

        let text = generate_template_from_file(&path, &TemplateSettings::default()).unwrap();
        let deck = parse(&text).unwrap();
        assert_eq!(
            deck.group_names(),
            vec!["CONTRL", "SYSTEM", "BASIS", "GUESS", "STATPT", "DATA"]
        );
        assert_eq!(deck.comments, vec!["! water"]);
        assert!(validate_deck(&deck).unwrap().is_empty());

        let geom = deck.data_section().unwrap().geometry().unwrap();
        assert_eq!(geom.elements, vec!["O", "H", "H"]);
        assert!((geom.get_atom_coords(1)[1] - 0.7572).abs() < 1e-9);
    }

    #[test]
    fn test_gjf_triplet_switches_to_uhf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("o2.gjf");
        fs::write(&path, TRIPLET_GJF).unwrap();

        let text = generate_template_from_file(&path, &TemplateSettings::default()).unwrap();
        let deck = parse(&text).unwrap();
        let contrl = deck.group("CONTRL").unwrap();
        assert_eq!(contrl.value("SCFTYP"), Some("UHF"));
        assert_eq!(contrl.value("MULT"), Some("3"));
        assert!(validate_deck(&deck).is_ok());

        let data = deck.data_section().unwrap();
        assert_eq!(data.title, "Oxygen triplet");
        assert_eq!(data.num_atoms(), 2);
    }

    #[test]
    fn test_unsupported_and_missing_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("water.pdb");
        fs::write(&path, "ATOM").unwrap();
        assert!(generate_template_from_file(&path, &TemplateSettings::default()).is_err());
        assert!(generate_template_from_file(
            dir.path().join("missing.xyz"),
            &TemplateSettings::default()
        )
        .is_err());
    }
}
