use anyhow::Result;
use chrono::Utc;
use tracing::info;

use super::normalize::normalize_scope;
use crate::cli::TransformArgs;
use crate::db::{DB_SCHEMA_VERSION, open_database};
use crate::model::TransformRunManifest;
use crate::util::{ensure_directory, now_utc_string, run_paths, utc_compact_string, write_json_pretty};

pub fn run(args: TransformArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("transform-{}", utc_compact_string(started_ts));

    let manifest_dir = args.store.manifest_dir();
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "transform_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args.store.resolved_db_path();

    info!(run_id = %run_id, scope = %args.scope, db_path = %db_path.display(), "starting transform");

    let mut connection = open_database(&db_path)?;
    let counts = normalize_scope(&mut connection, &args.scope, args.keep_staging)?;

    let manifest = TransformRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        scope: args.scope.clone(),
        paths: run_paths(&args.store),
        counts: counts.clone(),
    };
    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote transform run manifest");

    info!(
        staged = counts.staged_records,
        categories_inserted = counts.categories_inserted,
        imported = counts.questions_inserted,
        skipped_missing_text = counts.skipped_missing_text,
        skipped_unresolved_category = counts.skipped_unresolved_category,
        easy = counts.easy,
        medium = counts.medium,
        hard = counts.hard,
        null_air_dates = counts.null_air_dates,
        staging_rows_discarded = counts.staging_rows_discarded,
        "transform completed"
    );

    Ok(())
}
