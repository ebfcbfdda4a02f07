//! gmsdeck command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Summary of a deck, with validation warnings
//! gmsdeck acetylene.inp
//!
//! # Validate only; exit status 1 on any problem
//! gmsdeck check acetylene.inp
//!
//! # Parsed structure as JSON
//! gmsdeck json acetylene.inp > acetylene.json
//!
//! # Canonical re-rendering
//! gmsdeck fmt acetylene.inp tidy.inp
//!
//! # Cartesian $DATA geometry as XYZ
//! gmsdeck xyz water.inp water.xyz
//!
//! # Deck template from a geometry, or a settings template
//! gmsdeck ci molecule.xyz
//! gmsdeck ci gmsdeck.cfg
//! ```
//!
//! Help is available with `gmsdeck --help [keywords|groups|examples]`.

use gmsdeck::deck::InputDeck;
use gmsdeck::parser::InputDeckParser;
use gmsdeck::settings::{SettingsManager, CONFIG_FILE_NAME};
use gmsdeck::{io, template_generator, validation};
use log::{info, warn};
use std::env;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let settings = match SettingsManager::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let level = settings
        .logging()
        .level
        .parse()
        .unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(env_logger::Target::Stderr)
        .format_timestamp_millis()
        .init();
    info!("Configuration loaded from: {}", settings.config_source());

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let command = args[1].as_str();
    let result = match command {
        "check" | "json" | "fmt" | "xyz" | "ci" if args.len() < 3 => {
            eprintln!("Error: Missing file argument");
            print_usage(&args[0]);
            process::exit(1);
        }
        "check" => run_check(Path::new(&args[2]), &settings),
        "json" => run_json(Path::new(&args[2]), &settings),
        "fmt" => run_fmt(Path::new(&args[2]), args.get(3).map(Path::new), &settings),
        "xyz" => run_xyz(Path::new(&args[2]), args.get(3).map(Path::new), &settings),
        "ci" if args[2] == CONFIG_FILE_NAME => run_create_settings_template(),
        "ci" => run_create_input(Path::new(&args[2]), args.get(3).map(Path::new), &settings),
        _ if command.starts_with('-') => {
            eprintln!("Error: Unknown command: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
        _ => run_summary(Path::new(command), &settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Check for help flags and print appropriate help
fn check_help_flags(args: &[String]) {
    use gmsdeck::help::*;

    if args[1] != "--help" && args[1] != "-h" {
        return;
    }
    match args.get(2).map(String::as_str) {
        Some("keywords") => print_keyword_help(),
        Some("groups") => print_group_help(),
        Some("examples") => print_examples(),
        _ => print_global_help(),
    }
    process::exit(0);
}

fn print_usage(program_name: &str) {
    eprintln!("gmsdeck - GAMESS input deck parser and checker");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} <deck>                  Summarize and validate a deck", program_name);
    eprintln!("  {} check <deck>            Validate a deck", program_name);
    eprintln!("  {} json <deck>             Print the parsed deck as JSON", program_name);
    eprintln!("  {} fmt <deck> [out]        Re-render a deck", program_name);
    eprintln!("  {} xyz <deck> [out]        Write the $DATA geometry as XYZ", program_name);
    eprintln!("  {} ci <geometry> [out]     Create a deck from .xyz or .gjf", program_name);
    eprintln!("  {} ci {}        Create a settings template", program_name, CONFIG_FILE_NAME);
    eprintln!();
    eprintln!("Run '{} --help' for more information.", program_name);
}

fn load_deck(path: &Path, settings: &SettingsManager) -> Result<InputDeck, Box<dyn std::error::Error>> {
    let parser = InputDeckParser::new(settings.parser_options());
    Ok(parser.parse_file(path)?)
}

/// Prints groups, comments and outside text, then the validation result.
fn run_summary(path: &Path, settings: &SettingsManager) -> Result<(), Box<dyn std::error::Error>> {
    let deck = load_deck(path, settings)?;

    println!("Input deck: {}", path.display());
    println!("{}", "─".repeat(76));
    for group in &deck.groups {
        if group.is_freeform() {
            println!("  ${:<8} {} line(s) of free-form text", group.name, group.body.len());
        } else {
            let keys: Vec<String> = group.entries.iter().map(|e| e.key()).collect();
            println!("  ${:<8} {}", group.name, keys.join(" "));
        }
        if !group.unparsed.is_empty() {
            println!("            unparsed: {}", group.unparsed.join(" "));
        }
    }
    println!("{}", "─".repeat(76));
    println!(
        "  {} group(s), {} comment line(s), {} outside block(s)",
        deck.groups.len(),
        deck.comments.len(),
        deck.outside_blocks().count()
    );

    if let Ok(data) = deck.data_section() {
        println!(
            "  $DATA: \"{}\", point group {}, {} atom record(s)",
            data.title,
            data.point_group.label,
            data.num_atoms()
        );
    }
    println!();

    let warnings = validation::validate_deck(&deck)?;
    if warnings.is_empty() {
        println!("✓ No problems found");
    } else {
        println!("{} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }
    Ok(())
}

fn run_check(path: &Path, settings: &SettingsManager) -> Result<(), Box<dyn std::error::Error>> {
    let deck = load_deck(path, settings)?;
    let warnings = validation::validate_deck(&deck)?;
    println!(
        "✓ {} is valid ({} group(s), {} warning(s))",
        path.display(),
        deck.groups.len(),
        warnings.len()
    );
    Ok(())
}

fn run_json(path: &Path, settings: &SettingsManager) -> Result<(), Box<dyn std::error::Error>> {
    let deck = load_deck(path, settings)?;
    println!("{}", io::deck_to_json(&deck)?);
    Ok(())
}

fn run_fmt(
    path: &Path,
    output: Option<&Path>,
    settings: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    let deck = load_deck(path, settings)?;
    match output {
        Some(out) => {
            io::write_deck(&deck, out)?;
            println!("✓ Deck written to {}", out.display());
        }
        None => print!("{}", io::render_deck(&deck)),
    }
    Ok(())
}

fn run_xyz(
    path: &Path,
    output: Option<&Path>,
    settings: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    let deck = load_deck(path, settings)?;
    let data = deck.data_section()?;
    if !data.point_group.is_c1() {
        warn!(
            "Point group {} is not C1; only the symmetry-unique atoms are written",
            data.point_group.label
        );
    }
    let geometry = data.geometry()?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path.with_extension("xyz"));
    io::write_xyz(&geometry, &output, &data.title)?;
    println!("✓ {} atom(s) written to {}", geometry.num_atoms, output.display());
    Ok(())
}

/// Creates a deck template from a geometry file.
fn run_create_input(
    geometry_file: &Path,
    output_path: Option<&Path>,
    settings: &SettingsManager,
) -> Result<(), Box<dyn std::error::Error>> {
    if !template_generator::is_supported_format(geometry_file) {
        return Err(format!(
            "Unsupported geometry format: {} (use .xyz or .gjf)",
            geometry_file.display()
        )
        .into());
    }

    let template = template_generator::generate_template_from_file(geometry_file, settings.template())?;
    let output_file: PathBuf = match output_path {
        Some(path) => path.to_path_buf(),
        None => template_generator::get_default_output_path(geometry_file),
    };
    template_generator::write_template_to_file(&template, &output_file)?;

    println!("✓ Template input deck created successfully!");
    println!("  Output file: {}", output_file.display());
    println!("\nNext steps:");
    println!("  1. Review the $CONTRL and $BASIS settings");
    println!("  2. Check it: gmsdeck check {}", output_file.display());
    Ok(())
}

/// Creates a settings template in the current directory.
fn run_create_settings_template() -> Result<(), Box<dyn std::error::Error>> {
    SettingsManager::create_template(Path::new(CONFIG_FILE_NAME))?;
    println!("✓ Settings template created successfully!");
    println!("  Output file: {}", CONFIG_FILE_NAME);
    Ok(())
}
