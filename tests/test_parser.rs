use gmsdeck::geometry::Coordinates;
use gmsdeck::io::{deck_to_json, render_deck, write_deck};
use gmsdeck::parser::{parse, parse_file, EntryPolicy, InputDeckParser, ParseError, ParserOptions};
use gmsdeck::validation::{decode_izmat, validate_deck, InternalKind};
use gmsdeck::InputDeck;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sample_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/acetylene_opt.inp")
}

fn sample() -> InputDeck {
    parse_file(&sample_path()).unwrap()
}

#[test]
fn test_sample_groups_in_file_order() {
    let deck = sample();
    assert_eq!(
        deck.group_names(),
        vec!["CONTRL", "SYSTEM", "BASIS", "GUESS", "DATA", "ZMAT", "LIBE"]
    );
}

#[test]
fn test_sample_contrl_entries() {
    let deck = sample();
    let contrl = deck.group("CONTRL").unwrap();
    assert_eq!(contrl.value("SCFTYP"), Some("RHF"));
    assert_eq!(contrl.value("RUNTYP"), Some("OPTIMIZE"));
    assert_eq!(contrl.get_as::<u32>("NZVAR"), Some(Ok(5)));

    let keys: Vec<String> = contrl.entries.iter().map(|e| e.key()).collect();
    assert_eq!(keys, vec!["SCFTYP", "RUNTYP", "COORD", "NZVAR"]);
}

#[test]
fn test_multi_line_izmat_is_one_group() {
    let deck = sample();
    assert_eq!(deck.groups_named("ZMAT").count(), 1);

    let zmat = deck.group("ZMAT").unwrap();
    assert_eq!(zmat.entries.len(), 1);
    let izmat = zmat.get("IZMAT(1)").unwrap();
    assert_eq!(izmat.index, Some(1));
    assert_eq!(izmat.value, "1,1,2, 1,1,3, 1,2,4, 5,3,1,2, 5,1,2,4");
    assert_eq!(izmat.elements().len(), 17);
}

#[test]
fn test_unterminated_system_group() {
    let text = "! truncated deck\n $CONTRL SCFTYP=RHF $END\n $SYSTEM TIMLIM=2\n   MWORDS=1\n";
    match parse(text) {
        Err(ParseError::UnterminatedGroup { group, line }) => {
            assert_eq!(group, "SYSTEM");
            assert_eq!(line, 3);
        }
        other => panic!("expected UnterminatedGroup, got {:?}", other),
    }
}

#[test]
fn test_comments_are_kept_verbatim_and_only_there() {
    let deck = sample();
    assert_eq!(
        deck.comments,
        vec![
            "! EXAM 25: acetylene geometry optimization in internal coordinates",
            "!   RHF/6-31G(d), linear bends defined through $LIBE",
            "! FINAL E= -76.8184223758, 6 iters, RMS gradient= 0.0000001",
        ]
    );

    for block in &deck.freeform_blocks {
        assert!(block.lines.iter().all(|l| !l.trim_start().starts_with('!')));
    }
    for group in &deck.groups {
        assert!(group.entries.iter().all(|e| !e.value.contains('!')));
    }
}

#[test]
fn test_outside_text_and_data_body() {
    let deck = sample();

    let outside: Vec<_> = deck.outside_blocks().collect();
    assert_eq!(outside.len(), 1);
    assert_eq!(outside[0].lines[0], "Acetylene optimization test deck");
    assert!(outside[0].lines[1].starts_with("-----"));

    let data_block = deck
        .freeform_blocks
        .iter()
        .find(|b| b.owner.as_deref() == Some("DATA"))
        .unwrap();
    let data = deck.group("DATA").unwrap();
    assert!(data.is_freeform());
    assert_eq!(data_block.lines, data.body);
    assert_eq!(data.body.len(), 10);
    assert_eq!(data.body[1], "DNH      4");
    assert_eq!(data.body[2], "");
    assert_eq!(data.body[5], "H  1 rCH  2 180.0");
}

#[test]
fn test_sample_geometry() {
    let data = sample().data_section().unwrap();
    assert_eq!(data.point_group.label, "DNH");
    assert_eq!(data.point_group.order, Some(4));

    let Coordinates::ZMatrix(zmat) = &data.coordinates else {
        panic!("expected Z-matrix coordinates");
    };
    assert_eq!(zmat.rows.len(), 4);
    let resolved = zmat.resolved().unwrap();
    assert_eq!(resolved[3], vec![(2, 1.06), (1, 180.0), (3, 0.0)]);
}

#[test]
fn test_sample_validates() {
    let deck = sample();
    assert!(validate_deck(&deck).unwrap().is_empty());

    let coords = decode_izmat(deck.group("ZMAT").unwrap()).unwrap();
    assert_eq!(coords.len(), 5);
    assert_eq!(
        coords
            .iter()
            .filter(|c| c.kind == InternalKind::LinearBend)
            .count(),
        2
    );
}

#[test]
fn test_render_round_trip() {
    let deck = sample();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tidy.inp");
    write_deck(&deck, &path).unwrap();

    let again = parse_file(&path).unwrap();
    assert_eq!(again.groups, deck.groups);
    assert_eq!(again.comments, deck.comments);
    assert_eq!(again.freeform_blocks, deck.freeform_blocks);
    assert_eq!(render_deck(&again), fs::read_to_string(&path).unwrap());
}

#[test]
fn test_group_order_preserved_for_many_groups() {
    let names = ["SCF", "DFT", "BASIS", "CONTRL", "PCM", "GUESS", "STATPT"];
    let text: String = names
        .iter()
        .enumerate()
        .map(|(i, n)| format!(" ${} X{}={} $END\n", n.to_lowercase(), i, i))
        .collect();
    let deck = parse(&text).unwrap();
    assert_eq!(deck.group_names(), names);
}

#[test]
fn test_policy_choice() {
    let text = " $CONTRL SCFTYP=RHF EXTRA $END\n";
    assert!(matches!(
        parse(text),
        Err(ParseError::MalformedEntry { ref token, line: 1, .. }) if token == "EXTRA"
    ));

    let parser = InputDeckParser::new(ParserOptions {
        policy: EntryPolicy::Permissive,
        ..ParserOptions::default()
    });
    let deck = parser.parse(text).unwrap();
    let contrl = deck.group("CONTRL").unwrap();
    assert_eq!(contrl.unparsed, vec!["EXTRA"]);
    assert!(render_deck(&deck).contains("SCFTYP=RHF EXTRA $END"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = parse_file(&dir.path().join("absent.inp")).unwrap_err();
    assert!(matches!(err, ParseError::Io(_)));
    assert_eq!(err.line(), None);
}

#[test]
fn test_json_export() {
    let json = deck_to_json(&sample()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["groups"].as_array().unwrap().len(), 7);
    assert_eq!(value["groups"][5]["entries"][0]["name"], "IZMAT");
    assert_eq!(value["groups"][5]["entries"][0]["index"], 1);
    assert_eq!(value["comments"].as_array().unwrap().len(), 3);
}
