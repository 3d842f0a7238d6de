//! Schema versioning for the profile directory.
//!
//! The applied version is kept in the `metadata` table. Each entry in
//! [`MIGRATIONS`] runs in its own transaction and records its version on
//! commit, so an interrupted upgrade resumes at the first unapplied step.
//!
//! - v1: the profiles table as created by [`SCHEMA_STATEMENTS`].
//! - v2: blank optional text becomes `NULL`, and bare LinkedIn handles left
//!   by older clients become full profile URLs.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::profile::LINKEDIN_PROFILE_PREFIX;

use super::schema::SCHEMA_STATEMENTS;

type Migration = fn(&Connection) -> Result<()>;

/// Ordered upgrades; entry `i` brings the schema to version `i + 1`.
const MIGRATIONS: &[Migration] = &[baseline, normalise_optional_columns];

/// The schema version a fully migrated database reports.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

const VERSION_KEY: &str = "schema_version";

/// Create missing tables and apply pending migrations.
///
/// # Errors
///
/// Returns an error if a statement fails or the stored version is newer than
/// this build understands.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let applied = schema_version(conn)?;
    if applied > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database is at schema v{applied}, newer than supported v{CURRENT_VERSION}"
            ),
        });
    }

    for (target, migrate) in (1..).zip(MIGRATIONS).skip_while(|(v, _)| *v <= applied) {
        let tx = conn.unchecked_transaction()?;
        migrate(&tx)?;
        record_version(&tx, target)?;
        tx.commit()?;
        info!(version = target, "schema migrated");
    }

    Ok(())
}

/// The applied schema version; 0 for a fresh database.
pub(crate) fn schema_version(conn: &Connection) -> Result<i32> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    stored.map_or(Ok(0), |value| {
        value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        })
    })
}

fn record_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

fn baseline(_conn: &Connection) -> Result<()> {
    debug!("baseline schema in place");
    Ok(())
}

fn normalise_optional_columns(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        r"
        UPDATE profiles SET linkedin_url = NULL WHERE trim(linkedin_url) = '';
        UPDATE profiles SET major = NULL WHERE trim(major) = '';
        UPDATE profiles SET bio = NULL WHERE trim(bio) = '';
        UPDATE profiles SET linkedin_url = '{LINKEDIN_PROFILE_PREFIX}' || trim(linkedin_url, '/ ')
            WHERE linkedin_url IS NOT NULL AND linkedin_url NOT LIKE '%linkedin.com/%';
        "
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn names(conn: &Connection, kind: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
            .unwrap();
        stmt.query_map([kind], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_reaches_current_version() {
        let conn = fresh();
        assert_eq!(schema_version(&conn).ok(), None, "no metadata table yet");

        initialize_schema(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
        assert_eq!(CURRENT_VERSION, 2);
        let tables = names(&conn, "table");
        assert!(tables.contains(&"profiles".to_string()));
        assert!(tables.contains(&"metadata".to_string()));
        let indexes = names(&conn, "index");
        assert!(indexes.iter().any(|n| n.contains("user_id")));
        assert!(indexes.iter().any(|n| n.contains("created_at")));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_newer_database_is_refused() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();
        record_version(&conn, CURRENT_VERSION + 1).unwrap();

        let err = initialize_schema(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_garbage_version_is_reported() {
        let conn = fresh();
        initialize_schema(&conn).unwrap();
        conn.execute(
            "UPDATE metadata SET value = 'two' WHERE key = ?1",
            [VERSION_KEY],
        )
        .unwrap();

        assert!(matches!(
            schema_version(&conn),
            Err(Error::DatabaseMigration { .. })
        ));
    }

    #[test]
    fn test_v2_normalises_legacy_rows() {
        let conn = fresh();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        record_version(&conn, 1).unwrap();
        conn.execute(
            r"
            INSERT INTO profiles (id, user_id, name, email, role, company, location,
                pledge_class, graduation_year, linkedin_url, major, bio, created_at, updated_at)
            VALUES
                ('a', 'u1', 'Ann', 'a@x.edu', 'r', 'c', 'l', 'Fall ''20', 2022, 'ann-lee/', '', ' ', 't', 't'),
                ('b', 'u2', 'Ben', 'b@x.edu', 'r', 'c', 'l', 'Fall ''20', 2022,
                    'https://www.linkedin.com/in/ben', 'Math', 'Hi', 't', 't')
            ",
            [],
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let row = |id: &str| -> (Option<String>, Option<String>, Option<String>) {
            conn.query_row(
                "SELECT linkedin_url, major, bio FROM profiles WHERE id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap()
        };
        assert_eq!(
            row("a"),
            (Some("https://www.linkedin.com/in/ann-lee".to_string()), None, None)
        );
        assert_eq!(
            row("b"),
            (
                Some("https://www.linkedin.com/in/ben".to_string()),
                Some("Math".to_string()),
                Some("Hi".to_string())
            )
        );
        assert_eq!(schema_version(&conn).unwrap(), 2);
    }
}
