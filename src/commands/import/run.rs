use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::sanitize::{decode_line, sanitize_line};
use super::staging::{SanitizedLine, load_staging_file};
use crate::cli::{ImportArgs, SourceEncoding};
use crate::db::{DB_SCHEMA_VERSION, open_database};
use crate::model::{ImportFileEntry, ImportRunManifest, ImportTotals};
use crate::util::{
    ensure_directory, now_utc_string, run_paths, sha256_file, utc_compact_string,
    write_json_pretty,
};

#[derive(Debug, Default)]
pub(super) struct SanitizedFile {
    pub lines: Vec<SanitizedLine>,
    pub lines_read: usize,
    pub encoding_skipped: usize,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("import-{}", utc_compact_string(started_ts));

    let manifest_dir = args.store.manifest_dir();
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "import_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args.store.resolved_db_path();

    info!(
        run_id = %run_id,
        scope = %args.scope,
        files = args.files.len(),
        db_path = %db_path.display(),
        "starting import"
    );

    let mut connection = open_database(&db_path)?;

    let mut files = Vec::with_capacity(args.files.len());
    let mut totals = ImportTotals::default();

    for path in &args.files {
        let entry = import_file(&mut connection, path, &args);
        if entry.error.is_some() {
            totals.files_aborted += 1;
        } else {
            totals.files_loaded += 1;
        }
        totals.rows_staged += entry.rows_staged;
        totals.encoding_skipped += entry.encoding_skipped;
        files.push(entry);
    }

    let status = if totals.files_aborted == 0 {
        "completed"
    } else {
        "completed_with_errors"
    };

    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        scope: args.scope.clone(),
        source_encoding: args.source_encoding.as_str().to_string(),
        paths: run_paths(&args.store),
        files,
        totals: totals.clone(),
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote import run manifest");

    info!(
        files_loaded = totals.files_loaded,
        files_aborted = totals.files_aborted,
        rows_staged = totals.rows_staged,
        encoding_skipped = totals.encoding_skipped,
        "import completed"
    );

    if totals.files_aborted > 0 {
        bail!(
            "{} of {} files aborted during staging",
            totals.files_aborted,
            args.files.len()
        );
    }

    Ok(())
}

fn import_file(connection: &mut Connection, path: &Path, args: &ImportArgs) -> ImportFileEntry {
    let mut entry = ImportFileEntry {
        path: path.display().to_string(),
        sha256: None,
        status: "aborted".to_string(),
        lines_read: 0,
        rows_staged: 0,
        encoding_skipped: 0,
        error: None,
    };

    info!(path = %path.display(), "staging file");

    match stage_file(connection, path, args, &mut entry) {
        Ok(()) => {
            entry.status = "loaded".to_string();
            info!(
                path = %path.display(),
                rows_staged = entry.rows_staged,
                encoding_skipped = entry.encoding_skipped,
                "file staged"
            );
        }
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "file load aborted");
            entry.error = Some(format!("{err:#}"));
        }
    }

    entry
}

fn stage_file(
    connection: &mut Connection,
    path: &Path,
    args: &ImportArgs,
    entry: &mut ImportFileEntry,
) -> Result<()> {
    entry.sha256 = Some(sha256_file(path)?);

    let sanitized = read_sanitized(path, args.header_lines, args.source_encoding)?;
    entry.lines_read = sanitized.lines_read;
    entry.encoding_skipped = sanitized.encoding_skipped;

    if let Some(cleaned_dir) = &args.cleaned_dir {
        let cleaned_path = write_cleaned_file(cleaned_dir, path, &sanitized.lines)?;
        info!(path = %cleaned_path.display(), "wrote cleaned file");
    }

    entry.rows_staged = load_staging_file(connection, &args.scope, &entry.path, &sanitized.lines)?;
    Ok(())
}

/// Reads a raw archive file, skipping the header block and blank lines. Lines that
/// fail to decode are logged with their line number and dropped.
pub(super) fn read_sanitized(
    path: &Path,
    header_lines: usize,
    encoding: SourceEncoding,
) -> Result<SanitizedFile> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut sanitized = SanitizedFile::default();
    for (index, chunk) in reader.split(b'\n').enumerate() {
        let line_number = index + 1;
        let mut bytes =
            chunk.with_context(|| format!("failed to read line {line_number} of {}", path.display()))?;
        if line_number <= header_lines {
            continue;
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
        if bytes.is_empty() {
            continue;
        }

        sanitized.lines_read += 1;
        let Some(decoded) = decode_line(&bytes, encoding) else {
            warn!(
                path = %path.display(),
                line = line_number,
                encoding = encoding.as_str(),
                "skipping undecodable record"
            );
            sanitized.encoding_skipped += 1;
            continue;
        };

        sanitized.lines.push(SanitizedLine {
            source_line: line_number,
            text: sanitize_line(&decoded),
        });
    }

    Ok(sanitized)
}

fn write_cleaned_file(cleaned_dir: &Path, source: &Path, lines: &[SanitizedLine]) -> Result<PathBuf> {
    ensure_directory(cleaned_dir)?;
    let stem = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    let cleaned_path = cleaned_dir.join(format!("{stem}.cleaned.tsv"));

    let mut contents = String::new();
    for line in lines {
        contents.push_str(&line.text);
        contents.push('\n');
    }
    fs::write(&cleaned_path, contents)
        .with_context(|| format!("failed to write {}", cleaned_path.display()))?;

    Ok(cleaned_path)
}
