//! MUSIC_FILES table definition and additive migration (spec §4.4).
//!
//! Grounded in the teacher's `db::engine::create_tables` (explicit
//! `CREATE TABLE IF NOT EXISTS`) and `db::migrations::run_migration`'s
//! `pragma_table_info` column-presence check, generalized into a data-driven
//! loop over the full column list instead of one hand-written case per column.

use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use crate::error::{VinylError, VinylResult};

pub const TABLE_NAME: &str = "music_files";

struct ColumnDef {
    name: &'static str,
    ddl: &'static str,
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef {
        name: "id",
        ddl: "INTEGER PRIMARY KEY AUTOINCREMENT",
    },
    ColumnDef {
        name: "file_path",
        ddl: "TEXT NOT NULL",
    },
    ColumnDef {
        name: "title",
        ddl: "TEXT",
    },
    ColumnDef {
        name: "artist",
        ddl: "TEXT",
    },
    ColumnDef {
        name: "album",
        ddl: "TEXT",
    },
    ColumnDef {
        name: "album_artist",
        ddl: "TEXT",
    },
    ColumnDef {
        name: "genre",
        ddl: "TEXT",
    },
    ColumnDef {
        name: "track_number",
        ddl: "INTEGER",
    },
    ColumnDef {
        name: "year",
        ddl: "INTEGER",
    },
    ColumnDef {
        name: "duration_seconds",
        ddl: "INTEGER",
    },
    ColumnDef {
        name: "bit_rate",
        ddl: "INTEGER",
    },
    ColumnDef {
        name: "sample_rate",
        ddl: "INTEGER",
    },
    ColumnDef {
        name: "file_type",
        ddl: "TEXT NOT NULL",
    },
    ColumnDef {
        name: "file_size_bytes",
        ddl: "INTEGER NOT NULL DEFAULT 0",
    },
    ColumnDef {
        name: "last_modified",
        ddl: "TEXT NOT NULL",
    },
    ColumnDef {
        name: "date_added",
        ddl: "TEXT NOT NULL",
    },
];

/// Create `music_files` if absent, then add any column present in
/// [`COLUMNS`] but missing from the table on disk (additive migration).
pub async fn ensure_schema(pool: &SqlitePool) -> VinylResult<()> {
    let column_list = COLUMNS
        .iter()
        .map(|c| format!("{} {}", c.name, c.ddl))
        .collect::<Vec<_>>()
        .join(",\n            ");

    let create = format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\n            {column_list}\n        );"
    );
    sqlx::query(&create)
        .execute(pool)
        .await
        .map_err(|e| VinylError::database("create music_files table", e))?;

    sqlx::query(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_music_files_file_path ON {TABLE_NAME}(file_path)"
    ))
    .execute(pool)
    .await
    .map_err(|e| VinylError::database("create file_path index", e))?;

    let existing: Vec<String> = sqlx::query(&format!("PRAGMA table_info({TABLE_NAME})"))
        .fetch_all(pool)
        .await
        .map_err(|e| VinylError::database("read table_info", e))?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    for column in COLUMNS {
        if column.name == "id" || existing.iter().any(|n| n == column.name) {
            continue;
        }
        let alter = format!("ALTER TABLE {TABLE_NAME} ADD COLUMN {} {}", column.name, column.ddl);
        sqlx::query(&alter)
            .execute(pool)
            .await
            .map_err(|e| VinylError::database("add missing column", e))?;
        tracing::info!(column = column.name, "added missing music_files column");
    }

    Ok(())
}
