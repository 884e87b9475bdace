use uuid::Uuid;

use crate::{Error, PostId, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

/// Who wrote a comment: exactly one of a registered user or a guest nickname
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Author {
    Registered(UserId),
    Guest(String),
}

/// One comment as stored by the backend, joined with its author's profile
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentRow {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub created_at: Time,
    pub updated_at: Option<Time>,
    pub likes_count: i64,

    pub user_id: Option<UserId>,
    pub guest_nickname: Option<String>,

    /// Profile columns, only ever set along with `user_id`
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl CommentRow {
    pub fn author(&self) -> Result<Author, Error> {
        match (self.user_id, &self.guest_nickname) {
            (Some(user), None) => Ok(Author::Registered(user)),
            (None, Some(nickname)) => Ok(Author::Guest(nickname.clone())),
            (Some(_), Some(_)) => Err(Error::Validation(format!(
                "comment {:?} has both a registered author and a guest nickname",
                self.id
            ))),
            (None, None) => Err(Error::Validation(format!(
                "comment {:?} has no author",
                self.id
            ))),
        }
    }
}

/// Comment submission, the backend assigns id and timestamp
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub author: Author,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation(String::from("comment content is empty")));
        }
        if let Author::Guest(nickname) = &self.author {
            if nickname.trim().is_empty() {
                return Err(Error::Validation(String::from("guest nickname is empty")));
            }
        }
        Ok(())
    }
}
