/// Database row types — these map directly to SQLite rows.
/// Distinct from cirrus-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

pub struct FolderRow {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
}

pub struct FileRow {
    pub id: String,
    pub folder_id: String,
    pub owner_id: String,
    pub name: String,
    pub size: i64,
    pub path: String,
    pub created_at: String,
}

pub struct InviteRow {
    pub id: String,
    pub folder_id: String,
    pub invited_by: String,
    pub invited_user_id: String,
    pub status: String,
    pub token: String,
    pub created_at: String,
}
