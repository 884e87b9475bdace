use crate::api::{CommentId, Db, Error, LikeTarget, Liker};

/// Viewer-scoped like state of one comment
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u32,
}

impl LikeState {
    pub fn toggled(self) -> LikeState {
        match self.liked {
            true => LikeState {
                liked: false,
                likes_count: self.likes_count.saturating_sub(1),
            },
            false => LikeState {
                liked: true,
                likes_count: self.likes_count.saturating_add(1),
            },
        }
    }
}

/// A like toggle that was applied locally and awaits backend confirmation
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PendingToggle {
    pub comment: CommentId,
    pub liker: Liker,
    pub before: LikeState,
    pub after: LikeState,

    /// Forest generation the optimistic state was applied to
    pub(crate) generation: u64,
}

impl PendingToggle {
    /// Sends the relationship change matching this toggle
    pub async fn send<D: Db + ?Sized>(&self, db: &D) -> Result<(), Error> {
        let target = LikeTarget::Comment(self.comment);
        match self.after.liked {
            true => db.insert_like(&self.liker, target).await,
            false => db.delete_like(&self.liker, target).await,
        }
    }
}
