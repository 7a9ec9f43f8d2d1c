// src/cli/migrate.rs — Database migration command
//
// Migrations run automatically when the server opens the database. This
// command shows where a file stands, applies pending ones, or reverts the
// latest one during development.

use std::path::Path;

use crate::storage::schema;

/// Show migration status, run pending migrations, or roll back the latest.
pub fn run_migrate(db_path: &Path, status_only: bool, rollback: bool) -> anyhow::Result<()> {
    if !db_path.exists() && (status_only || rollback) {
        println!("No database found at: {}", db_path.display());
        println!("Run `winear serve` or `winear migrate` to create it.");
        return Ok(());
    }

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(db_path)?;

    if status_only {
        return show_migration_status(&conn, db_path);
    }

    if rollback {
        match schema::rollback_latest(&conn)? {
            Some(version) => println!("Rolled back migration v{}.", version),
            None => println!("No migrations to roll back."),
        }
        return show_migration_status(&conn, db_path);
    }

    println!("Running database migrations...");
    schema::run_migrations(&conn)?;
    println!("Migrations complete.");
    show_migration_status(&conn, db_path)
}

fn show_migration_status(conn: &rusqlite::Connection, db_path: &Path) -> anyhow::Result<()> {
    let current = schema::current_version(conn)?;
    println!("Database: {}", db_path.display());
    println!(
        "Schema version: {} (latest known: {})",
        current,
        schema::latest_version()
    );

    let mut stmt =
        conn.prepare("SELECT version, name, applied_at FROM _migrations ORDER BY version")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    for row in rows {
        let (version, name, applied_at) = row?;
        println!("  v{}: {} (applied {})", version, name, applied_at);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_then_rollback_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winear.db");

        run_migrate(&path, true, false).unwrap();
        assert!(!path.exists());

        run_migrate(&path, false, false).unwrap();
        let conn = rusqlite::Connection::open(&path).unwrap();
        assert_eq!(schema::current_version(&conn).unwrap(), schema::latest_version());
        drop(conn);

        run_migrate(&path, false, true).unwrap();
        let conn = rusqlite::Connection::open(&path).unwrap();
        assert_eq!(schema::current_version(&conn).unwrap(), 0);
    }
}
