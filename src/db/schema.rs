use anyhow::{Context, Result};
use rusqlite::Connection;

/// Schema steps in order. The database's `user_version` is the number of
/// steps already applied.
const MIGRATIONS: &[(&str, &str)] = &[("initial", include_str!("migrations/001_initial.sql"))];

pub fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    usize::try_from(version).context("Negative schema version")
}

/// Bring the schema up to date. Each step commits together with its version bump.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current = schema_version(conn)?;
    if current > MIGRATIONS.len() {
        anyhow::bail!(
            "Database schema version {current} is newer than this build supports ({})",
            MIGRATIONS.len()
        );
    }

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current) {
        let version = index + 1;
        tracing::info!(version, name, "Applying schema migration");

        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Schema migration {version} ({name}) failed"))?;
        tx.pragma_update(None, "user_version", version as i64)?;
        tx.commit()?;
    }

    Ok(())
}
