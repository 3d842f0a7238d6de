//! Storage layer for rollcall.
//!
//! This module provides a `SQLite`-backed [`ProfileStore`]. It is the local
//! stand-in for the hosted relational store: rows are keyed by owner identity,
//! spheres are kept as a JSON array, and timestamps are RFC 3339 text.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ports::{OwnerId, ProfileStore};
use crate::profile::{Profile, ProfileRecord};

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, name, email, role, company, sphere, major, location,
           pledge_class, graduation_year, linkedin_url, bio, profile_picture_url,
           created_at, updated_at
    FROM profiles
";

/// Profile store backed by a local `SQLite` database.
#[derive(Debug)]
pub struct SqliteProfileStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Open or create a profile database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        let count = conn.query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))?;
        Ok(count)
    }

    fn timestamp(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn find_by_owner(conn: &Connection, owner: &OwnerId) -> Result<Option<Profile>> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at ASC LIMIT 1");
        let profile = conn
            .query_row(&sql, [owner.as_str()], Self::row_to_profile)
            .optional()?;
        Ok(profile)
    }

    fn find_by_id(conn: &Connection, id: &str) -> Result<Option<Profile>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
        let profile = conn
            .query_row(&sql, [id], Self::row_to_profile)
            .optional()?;
        Ok(profile)
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
        let sphere_json: String = row.get(6)?;
        let sphere: Vec<String> = serde_json::from_str(&sphere_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let parse_time = |idx: usize| -> rusqlite::Result<DateTime<Utc>> {
            let text: String = row.get(idx)?;
            Ok(DateTime::parse_from_rfc3339(&text).map_or_else(
                |_| {
                    warn!("Unparseable timestamp {text:?} in profiles, using now");
                    Utc::now()
                },
                |dt| dt.with_timezone(&Utc),
            ))
        };

        Ok(Profile {
            id: row.get(0)?,
            user_id: OwnerId::new(row.get::<_, String>(1)?),
            record: ProfileRecord {
                name: row.get(2)?,
                email: row.get(3)?,
                role: row.get(4)?,
                company: row.get(5)?,
                sphere,
                major: row.get(7)?,
                location: row.get(8)?,
                pledge_class: row.get(9)?,
                graduation_year: row.get(10)?,
                linkedin_url: row.get(11)?,
                bio: row.get(12)?,
                profile_picture_url: row.get(13)?,
            },
            created_at: parse_time(14)?,
            updated_at: parse_time(15)?,
        })
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn select_by_owner(&self, owner: &OwnerId) -> Result<Option<Profile>> {
        let conn = self.conn.lock().await;
        Self::find_by_owner(&conn, owner)
    }

    async fn insert(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile> {
        let conn = self.conn.lock().await;
        let id = Uuid::new_v4().to_string();
        let now = Self::timestamp(Utc::now());
        let sphere = serde_json::to_string(&record.sphere)?;

        conn.execute(
            r"
            INSERT INTO profiles (
                id, user_id, name, email, role, company, sphere, major, location,
                pledge_class, graduation_year, linkedin_url, bio, profile_picture_url,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
            ",
            params![
                id,
                owner.as_str(),
                record.name,
                record.email,
                record.role,
                record.company,
                sphere,
                record.major,
                record.location,
                record.pledge_class,
                record.graduation_year,
                record.linkedin_url,
                record.bio,
                record.profile_picture_url,
                now,
            ],
        )?;
        debug!("Inserted profile {} for {}", id, owner);

        Self::find_by_id(&conn, &id)?
            .ok_or_else(|| Error::internal(format!("profile {id} vanished after insert")))
    }

    async fn update(&self, owner: &OwnerId, record: &ProfileRecord) -> Result<Profile> {
        let conn = self.conn.lock().await;
        let now = Self::timestamp(Utc::now());
        let sphere = serde_json::to_string(&record.sphere)?;

        let changed = conn.execute(
            r"
            UPDATE profiles SET
                name = ?2, email = ?3, role = ?4, company = ?5, sphere = ?6, major = ?7,
                location = ?8, pledge_class = ?9, graduation_year = ?10, linkedin_url = ?11,
                bio = ?12, profile_picture_url = ?13, updated_at = ?14
            WHERE user_id = ?1
            ",
            params![
                owner.as_str(),
                record.name,
                record.email,
                record.role,
                record.company,
                sphere,
                record.major,
                record.location,
                record.pledge_class,
                record.graduation_year,
                record.linkedin_url,
                record.bio,
                record.profile_picture_url,
                now,
            ],
        )?;
        if changed == 0 {
            return Err(Error::collaborator(
                "profile store",
                "No profile found for this user",
            ));
        }
        if changed > 1 {
            warn!("Updated {} profiles owned by {}", changed, owner);
        }
        debug!("Updated profile for {}", owner);

        Self::find_by_owner(&conn, owner)?
            .ok_or_else(|| Error::internal(format!("profile for {owner} vanished after update")))
    }

    async fn select_all(&self) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().await;
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC");
        let mut stmt = conn.prepare(&sql)?;
        let profiles = stmt
            .query_map([], Self::row_to_profile)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(profiles)
    }
}
