pub mod auth;
pub mod files;
pub mod folders;
pub mod invites;
pub mod middleware;
pub mod profiles;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use cirrus_db::models::{FileRow, FolderRow, ProfileRow, UserRow};
use cirrus_types::models::{FileObject, Folder, Profile, User};

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; fall back to the epoch on corrupt rows.
pub(crate) fn parse_sqlite_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub(crate) fn parse_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt uuid '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

pub(crate) fn user_from_row(row: &UserRow) -> User {
    User {
        id: parse_uuid(&row.id, "user"),
        email: row.email.clone(),
        created_at: parse_sqlite_timestamp(&row.created_at, "user"),
    }
}

pub(crate) fn profile_from_row(row: &ProfileRow) -> Profile {
    Profile {
        id: parse_uuid(&row.id, "profile"),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        email: row.email.clone(),
    }
}

pub(crate) fn folder_from_row(row: &FolderRow) -> Folder {
    Folder {
        id: parse_uuid(&row.id, "folder"),
        name: row.name.clone(),
        owner_id: parse_uuid(&row.owner_id, "folder"),
        created_at: parse_sqlite_timestamp(&row.created_at, "folder"),
    }
}

pub(crate) fn file_from_row(row: &FileRow) -> FileObject {
    FileObject {
        id: parse_uuid(&row.id, "file"),
        folder_id: parse_uuid(&row.folder_id, "file"),
        owner_id: parse_uuid(&row.owner_id, "file"),
        name: row.name.clone(),
        size: row.size,
        path: row.path.clone(),
        created_at: parse_sqlite_timestamp(&row.created_at, "file"),
    }
}
