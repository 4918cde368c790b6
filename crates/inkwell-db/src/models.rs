/// Database row types. These map directly to SQLite rows.
/// Distinct from inkwell-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub tone: Option<String>,
    pub cover_image: Option<String>,
    pub status: String,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct PublishedRow {
    pub post: PostRow,
    pub author_username: String,
}

/// Insert payload for a new post.
pub struct NewPost<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub tone: Option<&'a str>,
    pub cover_image: Option<&'a str>,
    pub status: &'a str,
}

/// Partial update. `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tone: Option<Option<String>>,
    pub cover_image: Option<Option<String>>,
    pub status: Option<String>,
}
