use crate::grading::GradeBand;
use rusqlite::{Connection, Row};
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("nazim.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    // "order" is a keyword; the column is band_order, the wire field stays
    // "order".
    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_bands(
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL,
            name_en TEXT NOT NULL,
            name_ar TEXT NOT NULL,
            name_ps TEXT NOT NULL,
            name_fa TEXT NOT NULL,
            min_percentage REAL NOT NULL,
            max_percentage REAL NOT NULL,
            band_order INTEGER NOT NULL,
            is_pass INTEGER NOT NULL,
            created_at TEXT,
            updated_at TEXT,
            deleted_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_bands_org ON grade_bands(organization_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_bands_org_live
            ON grade_bands(organization_id, deleted_at)",
        [],
    )?;

    Ok(conn)
}

pub fn band_from_row(row: &Row) -> rusqlite::Result<GradeBand> {
    Ok(GradeBand {
        id: row.get("id")?,
        organization_id: row.get("organization_id")?,
        name_en: row.get("name_en")?,
        name_ar: row.get("name_ar")?,
        name_ps: row.get("name_ps")?,
        name_fa: row.get("name_fa")?,
        min_percentage: row.get("min_percentage")?,
        max_percentage: row.get("max_percentage")?,
        order: row.get("band_order")?,
        is_pass: row.get::<_, i64>("is_pass")? != 0,
    })
}

/// Materialize the live (non-soft-deleted) bands for one organization,
/// highest order first. Each call is an independent snapshot; concurrent
/// admin edits land in later calls.
pub fn active_bands(conn: &Connection, organization_id: &str) -> anyhow::Result<Vec<GradeBand>> {
    let mut stmt = conn.prepare(
        "SELECT id, organization_id, name_en, name_ar, name_ps, name_fa,
                min_percentage, max_percentage, band_order, is_pass
           FROM grade_bands
          WHERE organization_id = ? AND deleted_at IS NULL
          ORDER BY band_order DESC, id ASC",
    )?;
    let rows = stmt.query_map([organization_id], band_from_row)?;
    let mut bands = Vec::new();
    for band in rows {
        bands.push(band?);
    }
    Ok(bands)
}
