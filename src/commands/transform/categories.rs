use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

/// Inserts every distinct category name staged under `scope` that is not already
/// present. Names match by exact, case-sensitive equality, so re-running over the
/// same staging rows inserts nothing.
pub fn resolve_categories(connection: &Connection, scope: &str) -> Result<usize> {
    let inserted = connection
        .execute(
            "
            INSERT OR IGNORE INTO categories(name)
            SELECT DISTINCT category
            FROM staging_records
            WHERE scope = ?1
              AND category IS NOT NULL
            ORDER BY category
            ",
            params![scope],
        )
        .with_context(|| format!("failed to resolve categories for scope {scope}"))?;

    Ok(inserted)
}

pub fn load_category_ids(connection: &Connection) -> Result<HashMap<String, i64>> {
    let mut statement = connection.prepare("SELECT id, name FROM categories")?;
    let rows = statement.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get(0)?)))?;

    let mut ids = HashMap::new();
    for row in rows {
        let (name, id) = row?;
        ids.insert(name, id);
    }

    Ok(ids)
}
