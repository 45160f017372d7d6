use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS profiles (
            id          TEXT PRIMARY KEY REFERENCES users(id),
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            email       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS folders (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            owner_id    TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_folders_owner
            ON folders(owner_id);

        CREATE TABLE IF NOT EXISTS folder_collaborators (
            id          TEXT PRIMARY KEY,
            folder_id   TEXT NOT NULL REFERENCES folders(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            role        TEXT NOT NULL DEFAULT 'collaborator',
            status      TEXT NOT NULL DEFAULT 'accepted',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(folder_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS files (
            id          TEXT PRIMARY KEY,
            folder_id   TEXT NOT NULL REFERENCES folders(id),
            owner_id    TEXT NOT NULL REFERENCES users(id),
            name        TEXT NOT NULL,
            size        INTEGER NOT NULL,
            path        TEXT NOT NULL UNIQUE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_files_folder
            ON files(folder_id, created_at);

        CREATE TABLE IF NOT EXISTS folder_invites (
            id               TEXT PRIMARY KEY,
            folder_id        TEXT NOT NULL REFERENCES folders(id),
            invited_by       TEXT NOT NULL REFERENCES users(id),
            invited_user_id  TEXT NOT NULL REFERENCES users(id),
            status           TEXT NOT NULL DEFAULT 'pending',
            token            TEXT NOT NULL UNIQUE,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_invites_invitee
            ON folder_invites(invited_user_id, status, created_at);

        -- Storage keys whose metadata row and blob got out of sync during a
        -- two-phase delete. A reconciliation sweep can drain this table.
        CREATE TABLE IF NOT EXISTS orphaned_objects (
            path        TEXT PRIMARY KEY,
            reason      TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
