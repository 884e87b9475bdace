use uuid::Uuid;

use crate::{CommentId, GuestId, PostId, Time, UserId};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeId(pub Uuid);

/// Who a like belongs to
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Liker {
    User(UserId),
    Guest(GuestId),
}

/// What a like is about
///
/// Only comment likes are handled by the client. `Post` mirrors the rows the
/// backend's likes table can also hold.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum LikeTarget {
    Post(PostId),
    Comment(CommentId),
}

/// At most one `Like` exists per (liker, target) pair
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Like {
    pub id: LikeId,
    pub liker: Liker,
    pub target: LikeTarget,
    pub created_at: Time,
}
