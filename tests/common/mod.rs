#![allow(dead_code)]

use std::path::Path;

use sql_session::prelude::*;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Parameters pointing the bundled session at `db` inside a temp directory.
pub fn params_for(db: &Path) -> ConnectionParams {
    ConnectionParams::builder()
        .server_name("test")
        .user_id("dba")
        .password("sql")
        .option("DatabaseFile", db.display().to_string())
        .finish()
}

#[cfg(feature = "sqlite")]
pub async fn connected(db: &Path) -> Result<Connection, SessionError> {
    init_tracing();
    let conn = Connection::new();
    conn.connect(&params_for(db)).await?;
    Ok(conn)
}

/// Integer value of `column` in the first row of `outcome`.
pub fn first_int(outcome: &QueryOutcome, column: &str) -> Option<i64> {
    outcome
        .rows()
        .and_then(ResultSet::first)
        .and_then(|row| row.get(column))
        .and_then(RowValues::as_int)
        .copied()
}
