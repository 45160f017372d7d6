use crate::Database;
use crate::models::{FileRow, FolderRow, InviteRow, ProfileRow, UserRow};
use anyhow::Result;

impl Database {
    // -- Users & profiles --

    /// Create the credential row and its profile together. Registration is
    /// all-or-nothing: a user row without a profile would 404 on every
    /// enrichment fetch, so neither insert may land alone.
    pub fn create_account(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx_guard = conn.unchecked_transaction()?;
            tx_guard.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            )?;
            tx_guard.execute(
                "INSERT INTO profiles (id, first_name, last_name, email) VALUES (?1, ?2, ?3, ?4)",
                (id, first_name, last_name, email),
            )?;
            tx_guard.commit()?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, email, password, created_at FROM users WHERE email = ?1")?;
            stmt.query_row([email], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, password, created_at FROM users WHERE id = ?1")?;
            stmt.query_row([id], user_from_row).optional()
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, first_name, last_name, email FROM profiles WHERE id = ?1")?;
            stmt.query_row([id], profile_from_row).optional()
        })
    }

    /// All profiles except the given user, for the share dialog's user list.
    pub fn list_profiles_except(&self, user_id: &str) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, first_name, last_name, email FROM profiles
                 WHERE id != ?1 ORDER BY first_name, last_name",
            )?;
            let rows = stmt
                .query_map([user_id], profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch profiles for a set of user IDs (invite enrichment).
    pub fn get_profiles_by_ids(&self, ids: &[String]) -> Result<Vec<ProfileRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, first_name, last_name, email FROM profiles WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), profile_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Folders --

    pub fn create_folder(&self, id: &str, name: &str, owner_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO folders (id, name, owner_id) VALUES (?1, ?2, ?3)",
                (id, name, owner_id),
            )?;
            Ok(())
        })
    }

    pub fn get_folder(&self, id: &str) -> Result<Option<FolderRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, owner_id, created_at FROM folders WHERE id = ?1")?;
            stmt.query_row([id], folder_from_row).optional()
        })
    }

    /// Folders visible to a user: owned ones plus those with an accepted
    /// collaborator row, newest first.
    pub fn list_folders_for_user(&self, user_id: &str) -> Result<Vec<FolderRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT f.id, f.name, f.owner_id, f.created_at
                 FROM folders f
                 LEFT JOIN folder_collaborators c ON c.folder_id = f.id
                 WHERE f.owner_id = ?1
                    OR (c.user_id = ?1 AND c.status = 'accepted')
                 ORDER BY f.created_at DESC, f.id",
            )?;
            let rows = stmt
                .query_map([user_id], folder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_folders_by_ids(&self, ids: &[String]) -> Result<Vec<FolderRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, name, owner_id, created_at FROM folders WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

            let rows = stmt
                .query_map(params.as_slice(), folder_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete a folder and every row referencing it, in one transaction.
    /// File blobs must be removed from storage by the caller beforehand.
    pub fn delete_folder(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let tx_guard = conn.unchecked_transaction()?;
            tx_guard.execute("DELETE FROM folder_invites WHERE folder_id = ?1", [id])?;
            tx_guard.execute("DELETE FROM folder_collaborators WHERE folder_id = ?1", [id])?;
            tx_guard.execute("DELETE FROM files WHERE folder_id = ?1", [id])?;
            tx_guard.execute("DELETE FROM folders WHERE id = ?1", [id])?;
            tx_guard.commit()?;
            Ok(())
        })
    }

    pub fn is_collaborator(&self, folder_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM folder_collaborators
                 WHERE folder_id = ?1 AND user_id = ?2 AND status = 'accepted'",
                [folder_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Files --

    pub fn insert_file(
        &self,
        id: &str,
        folder_id: &str,
        owner_id: &str,
        name: &str,
        size: i64,
        path: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO files (id, folder_id, owner_id, name, size, path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, folder_id, owner_id, name, size, path],
            )?;
            Ok(())
        })
    }

    pub fn get_file(&self, id: &str) -> Result<Option<FileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, folder_id, owner_id, name, size, path, created_at
                 FROM files WHERE id = ?1",
            )?;
            stmt.query_row([id], file_from_row).optional()
        })
    }

    pub fn list_files(&self, folder_id: &str) -> Result<Vec<FileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, folder_id, owner_id, name, size, path, created_at
                 FROM files WHERE folder_id = ?1
                 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt
                .query_map([folder_id], file_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns true if a row was deleted.
    pub fn delete_file(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM files WHERE id = ?1", [id])?;
            Ok(affected == 1)
        })
    }

    // -- Invites --

    pub fn insert_invite(
        &self,
        id: &str,
        folder_id: &str,
        invited_by: &str,
        invited_user_id: &str,
        token: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO folder_invites (id, folder_id, invited_by, invited_user_id, status, token)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                rusqlite::params![id, folder_id, invited_by, invited_user_id, token],
            )?;
            Ok(())
        })
    }

    pub fn get_invite(&self, id: &str) -> Result<Option<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, folder_id, invited_by, invited_user_id, status, token, created_at
                 FROM folder_invites WHERE id = ?1",
            )?;
            stmt.query_row([id], invite_from_row).optional()
        })
    }

    pub fn list_pending_invites(&self, invited_user_id: &str) -> Result<Vec<InviteRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, folder_id, invited_by, invited_user_id, status, token, created_at
                 FROM folder_invites
                 WHERE invited_user_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt
                .query_map([invited_user_id], invite_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_pending_invites(&self, invited_user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM folder_invites
                 WHERE invited_user_id = ?1 AND status = 'pending'",
                [invited_user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Accept a pending invite and grant folder access in one transaction.
    /// The guarded status UPDATE and the collaborator INSERT commit or roll
    /// back together, so an accepted invite always has its collaborator row.
    /// Returns false when the invite is missing or already terminal.
    pub fn accept_invite(&self, id: &str, collaborator_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let tx_guard = conn.unchecked_transaction()?;
            let affected = tx_guard.execute(
                "UPDATE folder_invites SET status = 'accepted'
                 WHERE id = ?1 AND status = 'pending'",
                [id],
            )?;
            if affected != 1 {
                return Ok(false);
            }
            // UNIQUE(folder_id, user_id): accepting a re-invite is a no-op grant
            tx_guard.execute(
                "INSERT OR IGNORE INTO folder_collaborators (id, folder_id, user_id)
                 SELECT ?2, folder_id, invited_user_id FROM folder_invites WHERE id = ?1",
                [id, collaborator_id],
            )?;
            tx_guard.commit()?;
            Ok(true)
        })
    }

    /// Move a pending invite to a terminal status without granting access
    /// (the rejection path). Returns false when the invite does not exist or
    /// is already terminal — the guard in the WHERE clause is what makes
    /// accepted/rejected immutable.
    pub fn resolve_invite(&self, id: &str, status: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE folder_invites SET status = ?2
                 WHERE id = ?1 AND status = 'pending'",
                [id, status],
            )?;
            Ok(affected == 1)
        })
    }

    // -- Orphaned objects --

    /// Record a storage key whose blob and metadata row got out of sync
    /// during a two-phase delete.
    pub fn record_orphan(&self, path: &str, reason: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO orphaned_objects (path, reason) VALUES (?1, ?2)",
                [path, reason],
            )?;
            Ok(())
        })
    }

    pub fn list_orphans(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT path FROM orphaned_objects ORDER BY created_at")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
    })
}

fn folder_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FolderRow> {
    Ok(FolderRow {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn file_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        owner_id: row.get(2)?,
        name: row.get(3)?,
        size: row.get(4)?,
        path: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn invite_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InviteRow> {
    Ok(InviteRow {
        id: row.get(0)?,
        folder_id: row.get(1)?,
        invited_by: row.get(2)?,
        invited_user_id: row.get(3)?,
        status: row.get(4)?,
        token: row.get(5)?,
        created_at: row.get(6)?,
    })
}
