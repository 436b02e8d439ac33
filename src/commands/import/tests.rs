use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;

use super::run::read_sanitized;
use super::sanitize::*;
use super::staging::*;
use crate::cli::{ImportArgs, SourceEncoding, StoreArgs};
use crate::db::{count_rows, open_in_memory};

fn line(source_line: usize, text: &str) -> SanitizedLine {
    SanitizedLine {
        source_line,
        text: text.to_string(),
    }
}

fn archive_line(fields: [&str; 9]) -> String {
    fields.join("\t")
}

#[test]
fn clean_text_collapses_quote_variants_and_entities() {
    assert_eq!(
        clean_text("\u{201C}Hamlet\u{201D} &amp; &quot;Lear&quot;"),
        "\"Hamlet\" &amp; \"Lear\""
    );
    assert_eq!(clean_text("It\u{2019}s &apos;here&apos;"), "It's 'here'");
    assert_eq!(clean_text("\u{00AB}Bonjour\u{00BB}"), "\"Bonjour\"");
}

#[test]
fn clean_text_drops_invisible_pictographic_and_control_content() {
    assert_eq!(clean_text("zero\u{200B}width\u{FEFF}"), "zerowidth");
    assert_eq!(clean_text("hot \u{1F525} take \u{2600}"), "hot  take ");
    assert_eq!(clean_text("bell\u{0007}ring"), "bellring");
    assert_eq!(clean_text("keep\ttab"), "keep\ttab");
}

#[test]
fn clean_text_folds_accents_to_ascii() {
    assert_eq!(clean_text("Caf\u{00E9} Mot\u{00F6}rhead"), "Cafe Motorhead");
    assert_eq!(clean_text("\u{4E2D}\u{6587}"), "");
    assert_eq!(clean_text("$1,000 (50%)!"), "$1,000 (50%)!");
}

#[test]
fn quote_field_follows_delimited_text_convention() {
    assert_eq!(quote_field("plain"), "plain");
    assert_eq!(quote_field("a, b"), "\"a, b\"");
    assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(quote_field("tab\there"), "\"tab\there\"");
}

#[test]
fn split_fields_honors_quoted_tabs_and_escaped_quotes() {
    let fields = split_fields("1\t\"a\tb\"\t\"he said \"\"no\"\"\"\t");
    assert_eq!(fields, vec!["1", "a\tb", "he said \"no\"", ""]);

    let literal = split_fields("1\tthe \"Raven\"\t2");
    assert_eq!(literal, vec!["1", "the \"Raven\"", "2"]);
}

#[test]
fn unbalanced_leading_quote_stays_literal() {
    let raw = "1\t200\t\tPOETRY\t\t\"Quoth the raven, nevermore\tPoe\t1999-01-01\t";
    assert_eq!(split_fields(raw).len(), 9);

    let row = parse_staging_row(&line(8, &sanitize_line(raw))).expect("nine columns survive");
    assert_eq!(row.answer.as_deref(), Some("\"Quoth the raven, nevermore"));
    assert_eq!(row.question.as_deref(), Some("Poe"));
    assert_eq!(row.air_date.as_deref(), Some("1999-01-01"));
}

#[test]
fn leading_quoted_title_keeps_its_quotes() {
    let answer = "\"Hey Jude\" & \"Let It Be\" were Beatles hits";
    let raw = archive_line(["2", "400", "", "MUSIC", "", answer, "The Beatles", "2004-02-02", ""]);

    let fields = split_fields(&raw);
    assert_eq!(fields.len(), 9);
    assert_eq!(fields[5], answer);

    let row = parse_staging_row(&line(9, &sanitize_line(&raw))).expect("row should parse");
    assert_eq!(row.answer.as_deref(), Some(answer));
}

#[test]
fn unbalanced_quote_row_loads_with_its_file() {
    let mut connection = open_in_memory().expect("in-memory db");
    let good = archive_line(["1", "100", "", "HISTORY", "", "a", "q", "1990-01-01", ""]);
    let unbalanced = sanitize_line(
        "1\t200\t\tPOETRY\t\t\"Quoth the raven, nevermore\tPoe\t1999-01-01\t",
    );

    let staged = load_staging_file(
        &mut connection,
        "default",
        "f.tsv",
        &[line(7, &good), line(8, &unbalanced)],
    )
    .expect("both rows load");
    assert_eq!(staged, 2);
}

#[test]
fn sanitized_line_with_embedded_tab_keeps_column_count() {
    let raw = "1\t200\t\tPOETS\t\"a\ttab\"\tWrote \u{201C}The Raven\u{201D}\tPoe\t1999-01-01\t";
    let original_count = split_fields(raw).len();
    assert_eq!(original_count, 9);

    let sanitized = sanitize_line(raw);
    let row = parse_staging_row(&line(7, &sanitized)).expect("sanitized line should parse");

    assert_eq!(row.comments.as_deref(), Some("a\ttab"));
    assert_eq!(row.answer.as_deref(), Some("Wrote \"The Raven\""));
    assert_eq!(row.question.as_deref(), Some("Poe"));
    assert_eq!(row.notes, None);
}

#[test]
fn decode_line_rejects_invalid_utf8_but_accepts_latin1() {
    let bytes = b"caf\xE9";
    assert_eq!(decode_line(bytes, SourceEncoding::Utf8), None);
    assert_eq!(
        decode_line(bytes, SourceEncoding::Latin1).as_deref(),
        Some("caf\u{00E9}")
    );
}

#[test]
fn parse_staging_row_maps_empty_fields_to_null() {
    let text = archive_line([
        "2", "", "", "SCIENCE", "", "This element has symbol Fe", "Iron", "not a date", "",
    ]);
    let row = parse_staging_row(&line(10, &text)).expect("row should parse");

    assert_eq!(row.source_line, 10);
    assert_eq!(row.round, Some(2));
    assert_eq!(row.clue_value, None);
    assert_eq!(row.daily_double_value, None);
    assert_eq!(row.category.as_deref(), Some("SCIENCE"));
    assert_eq!(row.comments, None);
    assert_eq!(row.air_date.as_deref(), Some("not a date"));
}

#[test]
fn parse_staging_row_rejects_wrong_column_count() {
    let err = parse_staging_row(&line(12, "1\t200\tSCIENCE")).expect_err("short row must fail");
    assert!(err.to_string().contains("expected 9 columns, found 3"));
}

#[test]
fn parse_staging_row_rejects_values_outside_smallint() {
    let text = archive_line(["1", "40000", "", "HISTORY", "", "a", "q", "2001-01-01", ""]);
    let err = parse_staging_row(&line(3, &text)).expect_err("overflow must fail");
    assert!(err.to_string().contains("clue_value"));
}

#[test]
fn load_staging_file_is_all_or_nothing() {
    let mut connection = open_in_memory().expect("in-memory db");
    let good = archive_line(["1", "100", "", "HISTORY", "", "a", "q", "1990-01-01", ""]);

    let staged = load_staging_file(
        &mut connection,
        "default",
        "season1.tsv",
        &[line(7, &good), line(8, &good)],
    )
    .expect("valid file loads");
    assert_eq!(staged, 2);

    let result = load_staging_file(
        &mut connection,
        "default",
        "season2.tsv",
        &[line(7, &good), line(8, "1\tbroken")],
    );
    assert!(result.is_err());

    let total = count_rows(&connection, "SELECT COUNT(*) FROM staging_records").expect("count");
    assert_eq!(total, 2);
}

#[test]
fn read_sanitized_skips_header_and_undecodable_lines() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("season1.tsv");

    let mut contents = Vec::new();
    for header in 0..6 {
        contents.extend_from_slice(format!("# header {header}\n").as_bytes());
    }
    contents.extend_from_slice(
        archive_line(["1", "100", "", "HISTORY", "", "a", "q", "1990-01-01", ""]).as_bytes(),
    );
    contents.extend_from_slice(b"\r\n");
    contents.extend_from_slice(b"1\t200\t\tBAD\t\tcaf\xE9\tq\t1990-01-01\t\n");
    contents.extend_from_slice(b"\n");
    fs::write(&path, contents).expect("write archive");

    let sanitized =
        read_sanitized(&path, 6, SourceEncoding::Utf8).expect("file should be readable");
    assert_eq!(sanitized.lines_read, 2);
    assert_eq!(sanitized.encoding_skipped, 1);
    assert_eq!(sanitized.lines.len(), 1);
    assert_eq!(sanitized.lines[0].source_line, 7);

    let latin1 =
        read_sanitized(&path, 6, SourceEncoding::Latin1).expect("file should be readable");
    assert_eq!(latin1.encoding_skipped, 0);
    assert_eq!(latin1.lines.len(), 2);
    assert!(latin1.lines[1].text.contains("cafe"));
}

fn write_archive(path: &Path, rows: &[String]) {
    let mut contents = String::new();
    for header in 0..6 {
        contents.push_str(&format!("# header {header}\n"));
    }
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    fs::write(path, contents).expect("write archive");
}

#[test]
fn import_run_continues_past_aborted_file_and_writes_manifest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = archive_line(["1", "100", "", "HISTORY", "", "a", "q", "1990-01-01", ""]);

    let season1 = dir.path().join("season1.tsv");
    write_archive(&season1, &[good.clone(), good.clone()]);
    let season2 = dir.path().join("season2.tsv");
    write_archive(&season2, &[good, "1\tbroken".to_string()]);

    let manifest_path = dir.path().join("import.json");
    let cleaned_dir = dir.path().join("cleaned");
    let args = ImportArgs {
        store: StoreArgs {
            cache_root: dir.path().join("cache"),
            db_path: None,
        },
        files: vec![season1, season2],
        scope: "default".to_string(),
        header_lines: 6,
        source_encoding: SourceEncoding::Utf8,
        cleaned_dir: Some(cleaned_dir.clone()),
        manifest_path: Some(manifest_path.clone()),
    };
    let db_path: PathBuf = args.store.resolved_db_path();

    let result = super::run(args);
    assert!(result.is_err(), "an aborted file makes the run fail");

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).expect("read manifest"))
            .expect("manifest is json");
    assert_eq!(manifest["status"], "completed_with_errors");
    assert_eq!(manifest["totals"]["files_loaded"], 1);
    assert_eq!(manifest["totals"]["files_aborted"], 1);
    assert_eq!(manifest["totals"]["rows_staged"], 2);
    assert_eq!(manifest["files"][0]["status"], "loaded");
    assert_eq!(manifest["files"][0]["sha256"].as_str().map(str::len), Some(64));
    assert_eq!(manifest["files"][1]["status"], "aborted");
    assert!(
        manifest["files"][1]["error"]
            .as_str()
            .is_some_and(|error| error.contains("expected 9 columns"))
    );

    let cleaned =
        fs::read_to_string(cleaned_dir.join("season1.cleaned.tsv")).expect("cleaned file");
    assert_eq!(cleaned.lines().count(), 2);

    let connection = Connection::open(&db_path).expect("open db");
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM staging_records").expect("count"),
        2
    );
}
