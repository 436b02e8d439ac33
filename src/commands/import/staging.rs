use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord};
use rusqlite::{Connection, params};

pub(super) const STAGING_COLUMNS: [&str; 9] = [
    "round",
    "clue_value",
    "daily_double_value",
    "category",
    "comments",
    "answer",
    "question",
    "air_date",
    "notes",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SanitizedLine {
    pub source_line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct StagingRow {
    pub source_line: usize,
    pub round: Option<i16>,
    pub clue_value: Option<i16>,
    pub daily_double_value: Option<i16>,
    pub category: Option<String>,
    pub comments: Option<String>,
    pub answer: Option<String>,
    pub question: Option<String>,
    pub air_date: Option<String>,
    pub notes: Option<String>,
}

/// Parses one sanitized line into a staging row. Anything other than exactly nine
/// columns, or a numeric column outside the smallint range, is a structural error.
pub(super) fn parse_staging_row(line: &SanitizedLine) -> Result<StagingRow> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.text.as_bytes());

    let mut record = StringRecord::new();
    let has_record = reader
        .read_record(&mut record)
        .with_context(|| format!("line {}: failed to parse delimited record", line.source_line))?;
    if !has_record {
        bail!("line {}: empty record", line.source_line);
    }
    if record.len() != STAGING_COLUMNS.len() {
        bail!(
            "line {}: expected {} columns, found {}",
            line.source_line,
            STAGING_COLUMNS.len(),
            record.len()
        );
    }

    let text = |index: usize| -> Option<String> {
        record
            .get(index)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    Ok(StagingRow {
        source_line: line.source_line,
        round: parse_smallint(&record, 0, line.source_line)?,
        clue_value: parse_smallint(&record, 1, line.source_line)?,
        daily_double_value: parse_smallint(&record, 2, line.source_line)?,
        category: text(3),
        comments: text(4),
        answer: text(5),
        question: text(6),
        air_date: text(7),
        notes: text(8),
    })
}

fn parse_smallint(record: &StringRecord, index: usize, source_line: usize) -> Result<Option<i16>> {
    let raw = record.get(index).unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(None);
    }

    raw.parse::<i16>().map(Some).with_context(|| {
        format!(
            "line {source_line}: column {} value {raw:?} is not a smallint",
            STAGING_COLUMNS[index]
        )
    })
}

/// Appends every line of one source file to `staging_records` in a single
/// transaction. The first malformed row aborts the whole file.
pub(super) fn load_staging_file(
    connection: &mut Connection,
    scope: &str,
    source_file: &str,
    lines: &[SanitizedLine],
) -> Result<usize> {
    let rows = lines
        .iter()
        .map(parse_staging_row)
        .collect::<Result<Vec<StagingRow>>>()
        .with_context(|| format!("malformed row in {source_file}"))?;

    let tx = connection.transaction()?;
    {
        let mut statement = tx.prepare(
            "
            INSERT INTO staging_records(
              scope, source_file, source_line, round, clue_value, daily_double_value,
              category, comments, answer, question, air_date, notes
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )?;

        for row in &rows {
            statement
                .execute(params![
                    scope,
                    source_file,
                    row.source_line as i64,
                    row.round,
                    row.clue_value,
                    row.daily_double_value,
                    row.category,
                    row.comments,
                    row.answer,
                    row.question,
                    row.air_date,
                    row.notes,
                ])
                .with_context(|| {
                    format!("failed to stage line {} of {source_file}", row.source_line)
                })?;
        }
    }
    tx.commit()?;

    Ok(rows.len())
}
