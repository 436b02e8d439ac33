use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

use crate::util::{ensure_directory, now_utc_string};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn open_database(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }

    let newly_created = !db_path.exists();
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;

    if newly_created {
        info!(path = %db_path.display(), "initialized new database");
    }

    Ok(connection)
}

#[cfg(test)]
pub fn open_in_memory() -> Result<Connection> {
    let connection = Connection::open_in_memory().context("failed to open in-memory database")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")?;
    connection
        .busy_timeout(std::time::Duration::from_secs(5))
        .context("failed to set busy timeout")?;
    Ok(())
}

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS staging_records (
          id INTEGER PRIMARY KEY,
          scope TEXT NOT NULL,
          source_file TEXT NOT NULL,
          source_line INTEGER NOT NULL,
          round INTEGER,
          clue_value INTEGER,
          daily_double_value INTEGER,
          category TEXT,
          comments TEXT,
          answer TEXT,
          question TEXT,
          air_date TEXT,
          notes TEXT
        );

        CREATE TABLE IF NOT EXISTS categories (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS trivia_questions (
          id INTEGER PRIMARY KEY,
          question TEXT NOT NULL,
          answer TEXT NOT NULL,
          category_id INTEGER NOT NULL REFERENCES categories(id),
          difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
          air_date TEXT,
          original_value INTEGER,
          original_round INTEGER,
          notes TEXT
        );

        CREATE TABLE IF NOT EXISTS user_generated_questions (
          id INTEGER PRIMARY KEY,
          question TEXT NOT NULL,
          answer TEXT NOT NULL,
          category_id INTEGER REFERENCES categories(id),
          difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
          created_by INTEGER,
          created_at TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'active'
            CHECK (status IN ('active', 'flagged', 'deleted')),
          notes TEXT
        );

        CREATE TABLE IF NOT EXISTS events (
          id INTEGER PRIMARY KEY,
          name TEXT NOT NULL,
          creator_id INTEGER NOT NULL,
          event_date TEXT,
          created_at TEXT NOT NULL,
          status TEXT NOT NULL DEFAULT 'draft'
            CHECK (status IN ('draft', 'active', 'completed')),
          description TEXT,
          is_deleted INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS rounds (
          id INTEGER PRIMARY KEY,
          event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
          category_id INTEGER REFERENCES categories(id),
          round_number INTEGER NOT NULL,
          name TEXT,
          created_at TEXT NOT NULL,
          is_deleted INTEGER NOT NULL DEFAULT 0,
          CONSTRAINT uq_rounds_event_round UNIQUE (event_id, round_number)
        );

        CREATE TABLE IF NOT EXISTS round_questions (
          id INTEGER PRIMARY KEY,
          round_id INTEGER NOT NULL REFERENCES rounds(id) ON DELETE CASCADE,
          question_number INTEGER NOT NULL,
          preset_question_id INTEGER REFERENCES trivia_questions(id) ON DELETE RESTRICT,
          user_question_id INTEGER REFERENCES user_generated_questions(id) ON DELETE RESTRICT,
          created_at TEXT NOT NULL,
          CONSTRAINT uq_round_questions_round_number UNIQUE (round_id, question_number),
          CONSTRAINT ck_round_questions_question_type CHECK (
            (preset_question_id IS NULL AND user_question_id IS NOT NULL)
            OR (preset_question_id IS NOT NULL AND user_question_id IS NULL)
          )
        );

        CREATE VIEW IF NOT EXISTS normalized_questions_view AS
        SELECT
          rq.id AS round_question_id,
          rq.round_id AS round_id,
          rq.question_number AS question_number,
          COALESCE(rq.preset_question_id, rq.user_question_id) AS question_id,
          CASE WHEN rq.preset_question_id IS NOT NULL THEN 'preset' ELSE 'user' END
            AS question_type,
          CASE WHEN rq.preset_question_id IS NOT NULL THEN tq.question ELSE uq.question END
            AS question,
          CASE WHEN rq.preset_question_id IS NOT NULL THEN tq.answer ELSE uq.answer END
            AS answer,
          CASE WHEN rq.preset_question_id IS NOT NULL THEN tq.difficulty ELSE uq.difficulty END
            AS difficulty,
          CASE WHEN rq.preset_question_id IS NOT NULL THEN tq.category_id ELSE uq.category_id END
            AS category_id,
          COALESCE(c.name, 'Uncategorized') AS category_name
        FROM round_questions rq
        LEFT JOIN trivia_questions tq ON tq.id = rq.preset_question_id
        LEFT JOIN user_generated_questions uq ON uq.id = rq.user_question_id
        LEFT JOIN categories c ON c.id = CASE
          WHEN rq.preset_question_id IS NOT NULL THEN tq.category_id
          ELSE uq.category_id
        END;

        CREATE INDEX IF NOT EXISTS idx_staging_scope ON staging_records(scope);
        CREATE INDEX IF NOT EXISTS idx_trivia_questions_category ON trivia_questions(category_id);
        CREATE INDEX IF NOT EXISTS idx_trivia_questions_difficulty ON trivia_questions(difficulty);
        CREATE INDEX IF NOT EXISTS idx_user_questions_category ON user_generated_questions(category_id);
        CREATE INDEX IF NOT EXISTS idx_rounds_event ON rounds(event_id);
        CREATE INDEX IF NOT EXISTS idx_round_questions_preset ON round_questions(preset_question_id);
        CREATE INDEX IF NOT EXISTS idx_round_questions_user ON round_questions(user_question_id);
        ",
        )
        .context("failed to initialize schema")?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows: {}", sql.trim()))
}
