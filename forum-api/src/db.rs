use async_trait::async_trait;

use crate::{CommentId, CommentRow, Error, LikeTarget, Liker, NewComment, PostId, Time, UserId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Session {
    Valid,
    Expired,
}

/// Data-access collaborator backing a comment thread
///
/// Mutating calls for registered users must be preceded by a check of
/// `current_session`. `insert_like` and `delete_like` are idempotent: liking
/// twice or unliking something not liked succeeds.
#[async_trait]
pub trait Db: Send + Sync {
    /// `None` means the visitor is a guest
    async fn current_identity(&self) -> Option<UserId>;
    async fn current_session(&self) -> Session;

    /// Rows of a post in chronological order
    async fn list_comments(&self, post: PostId) -> Result<Vec<CommentRow>, Error>;

    /// Comments of `post` that `liker` currently likes
    async fn list_liked_comments(
        &self,
        liker: &Liker,
        post: PostId,
    ) -> Result<Vec<CommentId>, Error>;

    async fn insert_comment(&self, c: NewComment) -> Result<CommentRow, Error>;

    /// Returns the new `updated_at`
    async fn update_comment(
        &self,
        id: CommentId,
        author: UserId,
        content: String,
    ) -> Result<Time, Error>;

    /// Also removes the replies of the comment
    async fn delete_comment(&self, id: CommentId, author: UserId) -> Result<(), Error>;

    async fn insert_like(&self, liker: &Liker, target: LikeTarget) -> Result<(), Error>;
    async fn delete_like(&self, liker: &Liker, target: LikeTarget) -> Result<(), Error>;
}
