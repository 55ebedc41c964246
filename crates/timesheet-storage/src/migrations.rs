use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema.
///
/// # Errors
///
/// Returns an error if table or index creation fails.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            external_id INTEGER NOT NULL UNIQUE,
            is_admin INTEGER NOT NULL DEFAULT 0,
            utc_offset_minutes INTEGER NOT NULL,
            max_work_hours REAL,
            max_commute_hours REAL,
            max_lunch_hours REAL,
            lunch_reminder_hour INTEGER,
            lunch_reminder_minute INTEGER,
            target_work_hours REAL,
            target_office_hours REAL,
            forgot_shutdown_threshold_percent REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tracking_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            state TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            commute_direction TEXT,
            note TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tracking_sessions_user
         ON tracking_sessions(user_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tracking_sessions_active
         ON tracking_sessions(user_id) WHERE ended_at IS NULL",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tracking_sessions_range
         ON tracking_sessions(user_id, started_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pending_mnemonics (
            id TEXT PRIMARY KEY,
            phrase TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            is_consumed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            user_id TEXT REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_pending_mnemonics_expires
         ON pending_mnemonics(expires_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS employer_attendance_records (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            date TEXT NOT NULL,
            clock_in TEXT,
            clock_out TEXT,
            working_hours REAL,
            has_conflict INTEGER NOT NULL DEFAULT 0,
            conflict_description TEXT,
            UNIQUE(user_id, date)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS employer_import_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            imported_at TEXT NOT NULL,
            record_count INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_compliance_rules (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            rule_type TEXT NOT NULL,
            is_enabled INTEGER NOT NULL DEFAULT 1,
            threshold_hours REAL NOT NULL,
            clock_in_kind TEXT NOT NULL,
            clock_out_kind TEXT NOT NULL,
            fixed_clock_in TEXT,
            fixed_clock_out TEXT,
            UNIQUE(user_id, rule_type)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS holidays (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            holiday_type TEXT NOT NULL,
            description TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_holidays_user
         ON holidays(user_id)",
        [],
    )?;

    add_column_if_missing(conn, "users", "forgot_shutdown_threshold_percent", "REAL")?;

    Ok(())
}

/// Additive migration helper: add a column to an existing table only if it
/// is not already present, mirroring the `pragma_table_info` guard used for
/// schema evolution elsewhere in the settings table.
fn add_column_if_missing(
    conn: &Connection,
    table: &str,
    column: &str,
    column_type: &str,
) -> Result<()> {
    let count: i32 = conn.query_row(
        &format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name='{column}'"),
        [],
        |row| row.get(0),
    )?;

    if count == 0 {
        conn.execute(
            &format!("ALTER TABLE {table} ADD COLUMN {column} {column_type}"),
            [],
        )?;
        log::info!("Added {column} column to {table} table");
    }

    Ok(())
}
