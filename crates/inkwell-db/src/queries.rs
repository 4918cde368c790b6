use crate::Database;
use crate::models::{NewPost, PostPatch, PostRow, PublishedRow, UserRow};
use crate::ownership::Mutation;
use anyhow::{Result, anyhow};
use chrono::SecondsFormat;
use rusqlite::{Connection, ErrorCode, Row};

const POST_COLUMNS: &str =
    "p.id, p.title, p.slug, p.content, p.tone, p.cover_image, p.status, p.author_id, p.created_at, p.updated_at";

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    /// Returns `false` when the username is already taken.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Posts --

    pub fn create_post(&self, new: &NewPost<'_>, author_id: &str) -> Result<PostRow> {
        let slug = self.slugs.slug_for(new.title);
        let now = now_timestamp();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, title, slug, content, tone, cover_image, status, author_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                rusqlite::params![
                    new.id,
                    new.title,
                    slug,
                    new.content,
                    new.tone,
                    new.cover_image,
                    new.status,
                    author_id,
                    now,
                ],
            )?;
            query_post(conn, new.id)?.ok_or_else(|| anyhow!("Post {} vanished after insert", new.id))
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Apply `patch` if `caller_id` authored the post. The slug is kept even
    /// when the title changes.
    pub fn update_post(&self, id: &str, patch: PostPatch, caller_id: &str) -> Result<Mutation<PostRow>> {
        self.owned_mutation(id, caller_id, |conn| {
            let mut post = query_post(conn, id)?.ok_or_else(|| anyhow!("Post not found: {}", id))?;

            if let Some(title) = patch.title {
                post.title = title;
            }
            if let Some(content) = patch.content {
                post.content = content;
            }
            if let Some(tone) = patch.tone {
                post.tone = tone;
            }
            if let Some(cover_image) = patch.cover_image {
                post.cover_image = cover_image;
            }
            if let Some(status) = patch.status {
                post.status = status;
            }
            post.updated_at = now_timestamp();

            conn.execute(
                "UPDATE posts
                 SET title = ?1, content = ?2, tone = ?3, cover_image = ?4, status = ?5, updated_at = ?6
                 WHERE id = ?7",
                rusqlite::params![
                    post.title,
                    post.content,
                    post.tone,
                    post.cover_image,
                    post.status,
                    post.updated_at,
                    id,
                ],
            )?;
            Ok(post)
        })
    }

    pub fn delete_post(&self, id: &str, caller_id: &str) -> Result<Mutation<()>> {
        self.owned_mutation(id, caller_id, |conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Published posts, newest first, with the author's username.
    pub fn list_published(&self) -> Result<Vec<PublishedRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS}, u.username
                 FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id
                 WHERE p.status = 'published'
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(PublishedRow {
                        post: post_from_row(row)?,
                        author_username: row
                            .get::<_, Option<String>>(10)?
                            .unwrap_or_else(|| "unknown".to_string()),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every post by `author_id`, drafts included, newest first.
    pub fn list_posts_by_author(&self, author_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 WHERE p.author_id = ?1
                 ORDER BY p.created_at DESC, p.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([author_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {} = ?1", column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([id], post_from_row).optional()?;
    Ok(row)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        content: row.get(3)?,
        tone: row.get(4)?,
        cover_image: row.get(5)?,
        status: row.get(6)?,
        author_id: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users(ids: &[&str]) -> Database {
        let db = Database::open_in_memory().unwrap();
        for id in ids {
            db.create_user(id, &format!("user-{}", id), "hash").unwrap();
        }
        db
    }

    #[test]
    fn duplicate_username_is_reported_not_raised() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("u1", "writer", "hash").unwrap());
        assert!(!db.create_user("u2", "writer", "hash").unwrap());
        assert!(db.get_user_by_id("u2").unwrap().is_none());
    }

    fn new_post<'a>(id: &'a str, title: &'a str, status: &'a str) -> NewPost<'a> {
        NewPost {
            id,
            title,
            content: "Body",
            tone: Some("Casual"),
            cover_image: None,
            status,
        }
    }

    #[test]
    fn create_post_assigns_slug_and_timestamps() {
        let db = db_with_users(&["alice"]);
        let post = db.create_post(&new_post("p1", "Hello World", "draft"), "alice").unwrap();
        assert!(post.slug.starts_with("hello-world-"));
        assert_eq!(post.author_id, "alice");
        assert_eq!(post.created_at, post.updated_at);
        assert_eq!(post.tone.as_deref(), Some("Casual"));
    }

    #[test]
    fn same_title_twice_does_not_collide() {
        let db = db_with_users(&["alice"]);
        let a = db.create_post(&new_post("p1", "Same", "draft"), "alice").unwrap();
        let b = db.create_post(&new_post("p2", "Same", "draft"), "alice").unwrap();
        assert_ne!(a.slug, b.slug);
    }

    #[test]
    fn non_owner_is_forbidden_for_every_pairing() {
        let users = ["alice", "bob", "carol"];
        let db = db_with_users(&users);
        for (i, owner) in users.iter().enumerate() {
            let id = format!("post-{}", i);
            db.create_post(&new_post(&id, "Mine", "draft"), owner).unwrap();
        }

        for (i, owner) in users.iter().enumerate() {
            let id = format!("post-{}", i);
            for caller in users.iter().filter(|c| *c != owner) {
                let patch = PostPatch {
                    title: Some("Hijacked".into()),
                    ..PostPatch::default()
                };
                assert_eq!(db.update_post(&id, patch, caller).unwrap(), Mutation::Forbidden);
                assert_eq!(db.delete_post(&id, caller).unwrap(), Mutation::Forbidden);
            }
            assert_eq!(db.get_post(&id).unwrap().unwrap().title, "Mine");
        }
    }

    #[test]
    fn missing_post_is_not_found() {
        let db = db_with_users(&["alice"]);
        assert_eq!(
            db.update_post("nope", PostPatch::default(), "alice").unwrap(),
            Mutation::NotFound
        );
        assert_eq!(db.delete_post("nope", "alice").unwrap(), Mutation::NotFound);
    }

    #[test]
    fn owner_can_patch_and_clear_fields() {
        let db = db_with_users(&["alice"]);
        let created = db
            .create_post(
                &NewPost {
                    cover_image: Some("/uploads/cat.png"),
                    ..new_post("p1", "Draft title", "draft")
                },
                "alice",
            )
            .unwrap();

        let patch = PostPatch {
            title: Some("Final title".into()),
            cover_image: Some(None),
            status: Some("published".into()),
            ..PostPatch::default()
        };
        let Mutation::Done(updated) = db.update_post("p1", patch, "alice").unwrap() else {
            panic!("owner update refused");
        };
        assert_eq!(updated.title, "Final title");
        assert_eq!(updated.cover_image, None);
        assert_eq!(updated.status, "published");
        assert_eq!(updated.content, "Body");
        assert_eq!(updated.slug, created.slug);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn owner_can_delete() {
        let db = db_with_users(&["alice"]);
        db.create_post(&new_post("p1", "Gone soon", "draft"), "alice").unwrap();
        assert_eq!(db.delete_post("p1", "alice").unwrap(), Mutation::Done(()));
        assert!(db.get_post("p1").unwrap().is_none());
    }

    #[test]
    fn published_feed_excludes_drafts_and_joins_author() {
        let db = db_with_users(&["alice"]);
        db.create_post(&new_post("p1", "Draft", "draft"), "alice").unwrap();
        db.create_post(&new_post("p2", "Old", "published"), "alice").unwrap();
        db.create_post(&new_post("p3", "New", "published"), "alice").unwrap();

        let feed = db.list_published().unwrap();
        let titles: Vec<&str> = feed.iter().map(|r| r.post.title.as_str()).collect();
        assert_eq!(titles, vec!["New", "Old"]);
        assert_eq!(feed[0].author_username, "user-alice");

        assert_eq!(db.list_posts_by_author("alice").unwrap().len(), 3);
    }

    #[test]
    fn invalid_status_is_rejected_by_schema() {
        let db = db_with_users(&["alice"]);
        assert!(db.create_post(&new_post("p1", "Bad", "archived"), "alice").is_err());
    }
}
