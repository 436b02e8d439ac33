use anyhow::{Result, bail};
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::db::count_rows;
use crate::util::{now_utc_string, write_json_pretty};

/// Counts of rows that break a content-model invariant. Every field is expected
/// to be zero except the two row totals, which are expected to be equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvariantSummary {
    pub slot_rows: i64,
    pub view_rows: i64,
    pub exclusive_source_violation_count: i64,
    pub view_mismatch_count: i64,
    pub dangling_question_reference_count: i64,
    pub dangling_category_count: i64,
    pub invalid_difficulty_count: i64,
    pub duplicate_round_number_count: i64,
    pub duplicate_question_number_count: i64,
    pub orphan_round_count: i64,
}

impl InvariantSummary {
    pub fn violation_count(&self) -> i64 {
        let parity = i64::from(self.slot_rows != self.view_rows);
        parity
            + self.exclusive_source_violation_count
            + self.view_mismatch_count
            + self.dangling_question_reference_count
            + self.dangling_category_count
            + self.invalid_difficulty_count
            + self.duplicate_round_number_count
            + self.duplicate_question_number_count
            + self.orphan_round_count
    }
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    generated_at: String,
    db_path: String,
    passed: bool,
    summary: InvariantSummary,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    if !db_path.exists() {
        bail!("database file missing: {}", db_path.display());
    }

    let connection = Connection::open_with_flags(&db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let summary = collect_invariants(&connection)?;
    let violations = summary.violation_count();

    info!(
        slot_rows = summary.slot_rows,
        view_rows = summary.view_rows,
        exclusive_source_violations = summary.exclusive_source_violation_count,
        view_mismatches = summary.view_mismatch_count,
        dangling_question_references = summary.dangling_question_reference_count,
        dangling_categories = summary.dangling_category_count,
        invalid_difficulties = summary.invalid_difficulty_count,
        duplicate_round_numbers = summary.duplicate_round_number_count,
        duplicate_question_numbers = summary.duplicate_question_number_count,
        orphan_rounds = summary.orphan_round_count,
        "invariant summary"
    );

    if let Some(report_path) = &args.report_path {
        let report = ValidationReport {
            generated_at: now_utc_string(),
            db_path: db_path.display().to_string(),
            passed: violations == 0,
            summary: summary.clone(),
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote validation report");
    }

    if violations > 0 {
        warn!(violations, "validation failed");
        bail!("{violations} invariant violations found");
    }

    info!("validation passed");
    Ok(())
}

pub fn collect_invariants(connection: &Connection) -> Result<InvariantSummary> {
    Ok(InvariantSummary {
        slot_rows: count_rows(connection, "SELECT COUNT(*) FROM round_questions")?,
        view_rows: count_rows(connection, "SELECT COUNT(*) FROM normalized_questions_view")?,
        exclusive_source_violation_count: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM round_questions
            WHERE (preset_question_id IS NULL) = (user_question_id IS NULL)
            ",
        )?,
        view_mismatch_count: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM normalized_questions_view v
            LEFT JOIN trivia_questions tq
              ON v.question_type = 'preset' AND tq.id = v.question_id
            LEFT JOIN user_generated_questions uq
              ON v.question_type = 'user' AND uq.id = v.question_id
            WHERE v.question IS NOT COALESCE(tq.question, uq.question)
               OR v.answer IS NOT COALESCE(tq.answer, uq.answer)
               OR v.difficulty IS NOT COALESCE(tq.difficulty, uq.difficulty)
            ",
        )?,
        dangling_question_reference_count: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM round_questions rq
            LEFT JOIN trivia_questions tq ON tq.id = rq.preset_question_id
            LEFT JOIN user_generated_questions uq ON uq.id = rq.user_question_id
            WHERE (rq.preset_question_id IS NOT NULL AND tq.id IS NULL)
               OR (rq.user_question_id IS NOT NULL AND uq.id IS NULL)
            ",
        )?,
        dangling_category_count: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM trivia_questions tq
            LEFT JOIN categories c ON c.id = tq.category_id
            WHERE c.id IS NULL
            ",
        )?,
        invalid_difficulty_count: count_rows(
            connection,
            "
            SELECT
              (SELECT COUNT(*) FROM trivia_questions
               WHERE difficulty NOT IN ('easy', 'medium', 'hard'))
              + (SELECT COUNT(*) FROM user_generated_questions
                 WHERE difficulty NOT IN ('easy', 'medium', 'hard'))
            ",
        )?,
        duplicate_round_number_count: count_rows(
            connection,
            "
            SELECT COUNT(*) FROM (
              SELECT event_id, round_number
              FROM rounds
              GROUP BY event_id, round_number
              HAVING COUNT(*) > 1
            )
            ",
        )?,
        duplicate_question_number_count: count_rows(
            connection,
            "
            SELECT COUNT(*) FROM (
              SELECT round_id, question_number
              FROM round_questions
              GROUP BY round_id, question_number
              HAVING COUNT(*) > 1
            )
            ",
        )?,
        orphan_round_count: count_rows(
            connection,
            "
            SELECT COUNT(*)
            FROM rounds r
            LEFT JOIN events e ON e.id = r.event_id
            WHERE e.id IS NULL
            ",
        )?,
    })
}
