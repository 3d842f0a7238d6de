//! `SQLite` schema definitions for the profile directory.

/// SQL statement to create the profiles table.
///
/// `user_id` is deliberately not unique: one profile per owner is kept by the
/// submission path, not by the store.
pub const CREATE_PROFILES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL,
    company TEXT NOT NULL,
    sphere TEXT NOT NULL DEFAULT '[]',
    major TEXT,
    location TEXT NOT NULL,
    pledge_class TEXT NOT NULL,
    graduation_year INTEGER NOT NULL,
    linkedin_url TEXT,
    bio TEXT,
    profile_picture_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `user_id` for owner lookups.
pub const CREATE_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_profiles_user_id ON profiles(user_id)
";

/// SQL statement to create an index on `created_at` for newest-first listing.
pub const CREATE_CREATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_profiles_created_at ON profiles(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PROFILES_TABLE,
    CREATE_OWNER_INDEX,
    CREATE_CREATED_INDEX,
    CREATE_METADATA_TABLE,
];
