use anyhow::Result;
use rusqlite::Connection;
use tracing::warn;

use crate::Database;
use crate::queries::OptionalExt;

/// Outcome of a mutation that requires the caller to own the post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    Done(T),
    Forbidden,
    NotFound,
}

/// The authorization rule for every post mutation: only the author may change
/// or delete a post.
pub fn caller_owns(caller_id: &str, author_id: &str) -> bool {
    caller_id == author_id
}

impl Database {
    /// Look up the post's author, check ownership and run `mutate`, all under
    /// one connection lock.
    pub(crate) fn owned_mutation<T, F>(&self, post_id: &str, caller_id: &str, mutate: F) -> Result<Mutation<T>>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.with_conn(|conn| {
            let author_id: Option<String> = conn
                .query_row("SELECT author_id FROM posts WHERE id = ?1", [post_id], |row| row.get(0))
                .optional()?;

            match author_id {
                None => Ok(Mutation::NotFound),
                Some(author_id) if !caller_owns(caller_id, &author_id) => {
                    warn!("User {} denied mutation of post {} owned by {}", caller_id, post_id, author_id);
                    Ok(Mutation::Forbidden)
                }
                Some(_) => mutate(conn).map(Mutation::Done),
            }
        })
    }
}
