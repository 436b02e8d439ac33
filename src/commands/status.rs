use anyhow::Result;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::db::count_rows;

const COUNTED_TABLES: [&str; 8] = [
    "staging_records",
    "categories",
    "trivia_questions",
    "user_generated_questions",
    "events",
    "rounds",
    "round_questions",
    "normalized_questions_view",
];

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args.store.resolved_db_path();
    info!(cache_root = %args.store.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let connection = Connection::open(&db_path)?;
    let schema_version: Option<String> = connection
        .query_row(
            "SELECT value FROM metadata WHERE key = 'db_schema_version'",
            [],
            |row| row.get(0),
        )
        .ok();
    info!(
        path = %db_path.display(),
        schema_version = %schema_version.unwrap_or_default(),
        "database status"
    );

    for table in COUNTED_TABLES {
        let rows = count_rows(&connection, &format!("SELECT COUNT(*) FROM {table}")).unwrap_or(0);
        info!(table, rows, "table rows");
    }

    let mut statement = connection.prepare(
        "SELECT scope, COUNT(*) FROM staging_records GROUP BY scope ORDER BY scope",
    )?;
    let scopes = statement.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for scope in scopes {
        let (scope, rows) = scope?;
        info!(scope = %scope, rows, "staged rows awaiting transform");
    }

    Ok(())
}
