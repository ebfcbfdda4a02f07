//! Built-in reference for input deck groups and keywords.
//!
//! The tables here back `gmsdeck --help` and are also what
//! [`validation`](crate::validation) consults to flag unknown groups and
//! out-of-range keyword values.

/// Documentation entry for an input group.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    /// Group name without the `$`
    pub name: &'static str,
    /// One-line purpose of the group
    pub description: &'static str,
    /// Whether the body is positional text rather than `KEY=VALUE` entries
    pub freeform: bool,
}

/// Documentation entry for a single keyword.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Group the keyword belongs to
    pub group: &'static str,
    /// Keyword name (e.g., "SCFTYP")
    pub name: &'static str,
    /// A brief description of what the keyword does
    pub description: &'static str,
    /// The default value, if there is one
    pub default_value: Option<&'static str>,
    /// Accepted values; empty when any value is accepted
    pub choices: &'static [&'static str],
    /// An example of the keyword in a deck
    pub example: Option<&'static str>,
}

/// All documented groups.
pub const GROUPS: &[GroupInfo] = &[
    GroupInfo { name: "CONTRL", description: "Chemical control data: wavefunction, run type, coordinates", freeform: false },
    GroupInfo { name: "SYSTEM", description: "Computer-related control: time and memory limits", freeform: false },
    GroupInfo { name: "BASIS", description: "Built-in basis set selection", freeform: false },
    GroupInfo { name: "DATA", description: "Title, point group and atom coordinates", freeform: true },
    GroupInfo { name: "ZMAT", description: "Internal coordinates for geometry searches", freeform: false },
    GroupInfo { name: "LIBE", description: "Points defining linear bend coordinates", freeform: false },
    GroupInfo { name: "GUESS", description: "Initial orbital guess", freeform: false },
    GroupInfo { name: "SCF", description: "SCF convergence control", freeform: false },
    GroupInfo { name: "STATPT", description: "Geometry search and stationary point control", freeform: false },
    GroupInfo { name: "FORCE", description: "Hessian and normal coordinate analysis", freeform: false },
    GroupInfo { name: "DFT", description: "Density functional theory options", freeform: false },
    GroupInfo { name: "TDDFT", description: "Time-dependent DFT excitations", freeform: false },
    GroupInfo { name: "CIS", description: "Singly excited configuration interaction", freeform: false },
    GroupInfo { name: "MP2", description: "Second order perturbation theory", freeform: false },
    GroupInfo { name: "CCINP", description: "Coupled cluster options", freeform: false },
    GroupInfo { name: "DET", description: "Determinant CI and MCSCF", freeform: false },
    GroupInfo { name: "DRT", description: "Distinct row table for GUGA CI", freeform: false },
    GroupInfo { name: "MCSCF", description: "MCSCF convergence control", freeform: false },
    GroupInfo { name: "IRC", description: "Intrinsic reaction coordinate", freeform: false },
    GroupInfo { name: "PCM", description: "Polarizable continuum solvation", freeform: false },
    GroupInfo { name: "ELPOT", description: "Electrostatic potential", freeform: false },
    GroupInfo { name: "ELMOM", description: "Electrostatic moments", freeform: false },
    GroupInfo { name: "GDDI", description: "Group distributed data interface", freeform: false },
    GroupInfo { name: "FMO", description: "Fragment molecular orbital method", freeform: false },
    GroupInfo { name: "EFRAG", description: "Effective fragment potentials", freeform: true },
    GroupInfo { name: "FMOXYZ", description: "FMO atom coordinates", freeform: true },
    GroupInfo { name: "VEC", description: "Orbital vectors", freeform: true },
    GroupInfo { name: "HESS", description: "Force constant matrix", freeform: true },
    GroupInfo { name: "GRAD", description: "Gradient vector", freeform: true },
    GroupInfo { name: "ECP", description: "Effective core potentials", freeform: true },
    GroupInfo { name: "MCP", description: "Model core potentials", freeform: true },
    GroupInfo { name: "POINTS", description: "Points for property evaluation", freeform: true },
    GroupInfo { name: "STONE", description: "Distributed multipole analysis", freeform: true },
];

/// All keyword documentation
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        group: "CONTRL",
        name: "SCFTYP",
        description: "Self-consistent field wavefunction type",
        default_value: Some("RHF"),
        choices: &["RHF", "UHF", "ROHF", "GVB", "MCSCF", "NONE"],
        example: Some("SCFTYP=UHF"),
    },
    Keyword {
        group: "CONTRL",
        name: "RUNTYP",
        description: "Kind of computation",
        default_value: Some("ENERGY"),
        choices: &[
            "ENERGY", "GRADIENT", "HESSIAN", "GAMMA", "OPTIMIZE", "TRUDGE", "SADPOINT", "MEX",
            "CONICAL", "IRC", "VSCF", "DRC", "MD", "GLOBOP", "OPTFMO", "GRADEXTR", "SURFACE",
            "COMP", "G3MP2", "PROP", "RAMAN", "NACME", "NMR", "EDA", "TRANSITN", "FFIELD",
            "TDHF", "TDHFX", "MAKEFP", "FMO0",
        ],
        example: Some("RUNTYP=OPTIMIZE"),
    },
    Keyword {
        group: "CONTRL",
        name: "COORD",
        description: "Style of the coordinates in $DATA",
        default_value: Some("UNIQUE"),
        choices: &["UNIQUE", "HINT", "PRINAXIS", "ZMT", "ZMTMPC", "FRAGONLY", "CART"],
        example: Some("COORD=ZMT"),
    },
    Keyword {
        group: "CONTRL",
        name: "UNITS",
        description: "Length unit of the $DATA coordinates",
        default_value: Some("ANGS"),
        choices: &["ANGS", "BOHR"],
        example: Some("UNITS=BOHR"),
    },
    Keyword {
        group: "CONTRL",
        name: "NZVAR",
        description: "Number of internal coordinates defined in $ZMAT; 0 means Cartesian",
        default_value: Some("0"),
        choices: &[],
        example: Some("NZVAR=5"),
    },
    Keyword {
        group: "CONTRL",
        name: "ICHARG",
        description: "Molecular charge",
        default_value: Some("0"),
        choices: &[],
        example: Some("ICHARG=-1"),
    },
    Keyword {
        group: "CONTRL",
        name: "MULT",
        description: "Spin multiplicity",
        default_value: Some("1"),
        choices: &[],
        example: Some("MULT=3"),
    },
    Keyword {
        group: "SYSTEM",
        name: "TIMLIM",
        description: "Time limit in minutes",
        default_value: Some("525600"),
        choices: &[],
        example: Some("TIMLIM=60"),
    },
    Keyword {
        group: "SYSTEM",
        name: "MWORDS",
        description: "Replicated memory per process, in millions of words",
        default_value: Some("1"),
        choices: &[],
        example: Some("MWORDS=50"),
    },
    Keyword {
        group: "BASIS",
        name: "GBASIS",
        description: "Gaussian basis set family",
        default_value: None,
        choices: &[],
        example: Some("GBASIS=N31"),
    },
    Keyword {
        group: "BASIS",
        name: "NGAUSS",
        description: "Number of Gaussians for STO-NG or N-31G style bases",
        default_value: None,
        choices: &[],
        example: Some("NGAUSS=6"),
    },
    Keyword {
        group: "BASIS",
        name: "NDFUNC",
        description: "Number of heavy atom polarization d functions",
        default_value: Some("0"),
        choices: &[],
        example: Some("NDFUNC=1"),
    },
    Keyword {
        group: "GUESS",
        name: "GUESS",
        description: "Initial orbital guess",
        default_value: Some("HUCKEL"),
        choices: &["HUCKEL", "HCORE", "MOREAD", "RDMINI", "MOSAVED", "SKIP", "FMO", "HUCSUB", "DMREAD"],
        example: Some("GUESS=MOREAD"),
    },
    Keyword {
        group: "STATPT",
        name: "OPTTOL",
        description: "Gradient convergence tolerance, Hartree/Bohr",
        default_value: Some("0.0001"),
        choices: &[],
        example: Some("OPTTOL=1.0E-5"),
    },
    Keyword {
        group: "STATPT",
        name: "NSTEP",
        description: "Maximum number of geometry search steps",
        default_value: Some("50"),
        choices: &[],
        example: Some("NSTEP=100"),
    },
    Keyword {
        group: "ZMAT",
        name: "IZMAT",
        description: "Internal coordinate definitions: a type code (1 stretch, 2 bend, \
                      3 torsion, 4 out-of-plane, 5 linear bend, 6 dihedral, 7 ghost torsion) \
                      followed by its atoms",
        default_value: None,
        choices: &[],
        example: Some("IZMAT(1)=1,1,2, 2,1,2,3"),
    },
    Keyword {
        group: "ZMAT",
        name: "DLC",
        description: "Generate delocalized internal coordinates",
        default_value: Some(".FALSE."),
        choices: &[".TRUE.", ".FALSE.", ".T.", ".F."],
        example: Some("DLC=.TRUE."),
    },
    Keyword {
        group: "ZMAT",
        name: "AUTO",
        description: "Generate the primitive internal coordinates automatically",
        default_value: Some(".FALSE."),
        choices: &[".TRUE.", ".FALSE.", ".T.", ".F."],
        example: Some("AUTO=.TRUE."),
    },
    Keyword {
        group: "LIBE",
        name: "APTS",
        description: "One x,y,z point per linear bend in $ZMAT, fixing the bend plane",
        default_value: None,
        choices: &[],
        example: Some("APTS(1)=1.0,0.0,0.0"),
    },
];

/// Documentation for a group, case-insensitively.
pub fn group_info(name: &str) -> Option<&'static GroupInfo> {
    GROUPS.iter().find(|g| g.name.eq_ignore_ascii_case(name))
}

/// Documentation for a keyword of a group, case-insensitively.
pub fn keyword_info(group: &str, name: &str) -> Option<&'static Keyword> {
    KEYWORDS
        .iter()
        .find(|k| k.group.eq_ignore_ascii_case(group) && k.name.eq_ignore_ascii_case(name))
}

/// Print the main help page
pub fn print_global_help() {
    println!("gmsdeck - GAMESS input deck parser and checker");
    println!();
    println!("USAGE:");
    println!("    gmsdeck [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    <deck>              Parse a deck and print a summary with warnings");
    println!("    check <deck>        Parse and validate a deck; exit 1 on any error");
    println!("    json <deck>         Print the parsed deck as JSON");
    println!("    fmt <deck> [out]    Re-render the deck in canonical form");
    println!("    xyz <deck> [out]    Write the Cartesian $DATA geometry as XYZ");
    println!("    ci <geometry> [out] Create a deck template from an .xyz or .gjf file");
    println!("    ci gmsdeck.cfg      Create a configuration template file");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]  Show help. Topics: keywords, groups, examples");
    println!();
    println!("CONFIGURATION FILE:");
    println!("    Supported locations, highest priority first:");
    println!("      - ./gmsdeck.cfg");
    println!("      - ~/.config/gmsdeck/gmsdeck.cfg");
    println!("      - /etc/gmsdeck/gmsdeck.cfg");
    println!("    Sections: [parser], [logging], [template]");
    println!();
}

/// Print the documented groups
pub fn print_group_help() {
    println!("INPUT GROUPS");
    println!("{}", "─".repeat(76));
    for group in GROUPS {
        let kind = if group.freeform { " (free-form)" } else { "" };
        println!("  ${:<8} {}{}", group.name, group.description, kind);
    }
    println!();
}

/// Print the keyword reference, grouped by input group
pub fn print_keyword_help() {
    println!("KEYWORD REFERENCE");
    println!("{}", "═".repeat(76));
    println!();

    for group in GROUPS {
        let keywords: Vec<&Keyword> = KEYWORDS.iter().filter(|k| k.group == group.name).collect();
        if keywords.is_empty() {
            continue;
        }
        println!("${}", group.name);
        println!("{}", "─".repeat(76));
        for keyword in keywords {
            print_keyword(keyword);
            println!();
        }
    }
}

/// Print example decks
pub fn print_examples() {
    println!("EXAMPLES");
    println!("{}", "═".repeat(76));
    println!();
    println!("Cartesian RHF energy:");
    println!();
    println!(" $CONTRL SCFTYP=RHF RUNTYP=ENERGY $END");
    println!(" $BASIS  GBASIS=N31 NGAUSS=6 NDFUNC=1 $END");
    println!(" $DATA");
    println!("Water");
    println!("C1");
    println!("O   8.0   0.000   0.000   0.117");
    println!("H   1.0   0.000   0.757  -0.467");
    println!("H   1.0   0.000  -0.757  -0.467");
    println!(" $END");
    println!();
    println!("Internal coordinate optimization with linear bends:");
    println!();
    println!(" $CONTRL SCFTYP=RHF RUNTYP=OPTIMIZE COORD=ZMT NZVAR=5 $END");
    println!(" $ZMAT   IZMAT(1)=1,1,2, 1,1,3, 1,2,4, 5,3,1,2, 5,1,2,4 $END");
    println!(" $LIBE   APTS(1)=1.0,0.0,0.0, 1.0,0.0,0.0 $END");
    println!();
}

/// Print single keyword
fn print_keyword(keyword: &Keyword) {
    println!("{}", keyword.name);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }
    if !keyword.choices.is_empty() {
        println!("    Values:  {}", keyword.choices.join(", "));
    }
    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert!(group_info("contrl").is_some());
        assert!(group_info("NOSUCH").is_none());
        assert_eq!(keyword_info("contrl", "scftyp").map(|k| k.name), Some("SCFTYP"));
        assert!(keyword_info("BASIS", "SCFTYP").is_none());
    }

    #[test]
    fn test_every_keyword_has_a_documented_group() {
        for keyword in KEYWORDS {
            assert!(group_info(keyword.group).is_some(), "{}", keyword.group);
        }
    }
}
