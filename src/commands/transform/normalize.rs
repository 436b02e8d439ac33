use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use tracing::warn;

use super::categories::{load_category_ids, resolve_categories};
use super::difficulty::{AirDateParser, classify};
use crate::model::{Difficulty, StagingRecord, TransformCounts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuestion {
    pub question: String,
    pub answer: String,
    pub category_id: i64,
    pub difficulty: Difficulty,
    pub air_date: Option<NaiveDate>,
    pub original_value: Option<i16>,
    pub original_round: Option<i16>,
    pub notes: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    MissingText,
    UnresolvedCategory,
}

/// Converts one staged archive row into a curated question. The archive stores
/// the prompt shown to players in `answer` and the expected response in
/// `question`; the two swap roles here.
pub fn normalize_record(
    record: &StagingRecord,
    category_ids: &HashMap<String, i64>,
    dates: &AirDateParser,
) -> Result<NormalizedQuestion, SkipReason> {
    let (Some(prompt), Some(response)) = (&record.answer, &record.question) else {
        return Err(SkipReason::MissingText);
    };

    let category_id = record
        .category
        .as_ref()
        .and_then(|name| category_ids.get(name))
        .copied()
        .ok_or(SkipReason::UnresolvedCategory)?;

    let air_date = dates.parse(record.air_date.as_deref());

    Ok(NormalizedQuestion {
        question: prompt.clone(),
        answer: response.clone(),
        category_id,
        difficulty: classify(record.round, record.clue_value, air_date),
        air_date,
        original_value: record.clue_value,
        original_round: record.round,
        notes: join_notes(record.comments.as_deref(), record.notes.as_deref()),
    })
}

/// Comments and notes joined by one space. Two empty inputs leave a lone space.
pub fn join_notes(comments: Option<&str>, notes: Option<&str>) -> String {
    format!("{} {}", comments.unwrap_or_default(), notes.unwrap_or_default())
}

pub fn load_staging_records(connection: &Connection, scope: &str) -> Result<Vec<StagingRecord>> {
    let mut statement = connection.prepare(
        "
        SELECT id, round, clue_value, category, comments,
               answer, question, air_date, notes
        FROM staging_records
        WHERE scope = ?1
        ORDER BY id
        ",
    )?;

    let rows = statement.query_map(params![scope], |row| {
        Ok(StagingRecord {
            id: row.get(0)?,
            round: row.get(1)?,
            clue_value: row.get(2)?,
            category: row.get(3)?,
            comments: row.get(4)?,
            answer: row.get(5)?,
            question: row.get(6)?,
            air_date: row.get(7)?,
            notes: row.get(8)?,
        })
    })?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to read staging records for scope {scope}"))
}

/// Resolves categories and writes one curated question per usable staging row,
/// all inside one transaction. Staged rows of the scope are discarded on success
/// unless `keep_staging` is set.
pub fn normalize_scope(
    connection: &mut Connection,
    scope: &str,
    keep_staging: bool,
) -> Result<TransformCounts> {
    let dates = AirDateParser::new()?;
    let tx = connection.transaction()?;

    let mut counts = TransformCounts {
        categories_inserted: resolve_categories(&tx, scope)?,
        ..TransformCounts::default()
    };
    let category_ids = load_category_ids(&tx)?;
    let records = load_staging_records(&tx, scope)?;
    counts.staged_records = records.len();

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO trivia_questions(
              question, answer, category_id, difficulty, air_date,
              original_value, original_round, notes
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )?;

        for record in &records {
            let normalized = match normalize_record(record, &category_ids, &dates) {
                Ok(normalized) => normalized,
                Err(SkipReason::MissingText) => {
                    counts.skipped_missing_text += 1;
                    continue;
                }
                Err(SkipReason::UnresolvedCategory) => {
                    warn!(
                        staging_id = record.id,
                        category = ?record.category,
                        "skipping record with unresolved category"
                    );
                    counts.skipped_unresolved_category += 1;
                    continue;
                }
            };

            statement
                .execute(params![
                    normalized.question,
                    normalized.answer,
                    normalized.category_id,
                    normalized.difficulty.as_str(),
                    normalized.air_date,
                    normalized.original_value,
                    normalized.original_round,
                    normalized.notes,
                ])
                .with_context(|| format!("failed to insert staging record {}", record.id))?;

            counts.questions_inserted += 1;
            if normalized.air_date.is_none() {
                counts.null_air_dates += 1;
            }
            match normalized.difficulty {
                Difficulty::Easy => counts.easy += 1,
                Difficulty::Medium => counts.medium += 1,
                Difficulty::Hard => counts.hard += 1,
            }
        }
    }

    if !keep_staging {
        counts.staging_rows_discarded = tx
            .execute("DELETE FROM staging_records WHERE scope = ?1", params![scope])
            .with_context(|| format!("failed to discard staging rows for scope {scope}"))?;
    }

    tx.commit()?;
    Ok(counts)
}
