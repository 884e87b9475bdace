use crate::{
    api::{Author, CommentId, CommentRow, Error, PostId, Time},
    Forest, LikeState,
};

pub const ANONYMOUS_NAME: &str = "Anonymous";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub parent_id: Option<CommentId>,

    pub content: String,
    pub created_at: Time,
    /// Set when the author edited the comment
    pub updated_at: Option<Time>,

    pub author: Author,
    /// Profile username for registered authors, nickname for guests
    pub author_name: String,
    pub avatar_url: Option<String>,

    pub likes_count: u32,
    /// Whether the current viewer likes this comment
    pub liked: bool,

    /// Child comments in chronological order
    pub replies: Forest,
}

impl Comment {
    /// Formats a backend row into a node with no replies yet
    pub fn from_row(row: CommentRow, liked: bool) -> Result<Comment, Error> {
        let author = row.author()?;
        let author_name = match &author {
            Author::Registered(_) => row
                .username
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| String::from(ANONYMOUS_NAME)),
            Author::Guest(nickname) => nickname.clone(),
        };
        let likes_count = match u32::try_from(row.likes_count) {
            Ok(c) => c,
            Err(_) => {
                tracing::warn!(
                    comment = ?row.id,
                    likes_count = row.likes_count,
                    "backend returned an out-of-range like count"
                );
                if row.likes_count < 0 {
                    0
                } else {
                    u32::MAX
                }
            }
        };
        Ok(Comment {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            author,
            author_name,
            avatar_url: row.avatar_url,
            likes_count,
            liked,
            replies: Forest::new(),
        })
    }

    pub fn like_state(&self) -> LikeState {
        LikeState {
            liked: self.liked,
            likes_count: self.likes_count,
        }
    }

    pub fn with_like_state(&self, s: LikeState) -> Comment {
        Comment {
            liked: s.liked,
            likes_count: s.likes_count,
            ..self.clone()
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::UserId, test_util::row};

    #[test]
    fn formats_registered_author() {
        let mut r = row(1, None);
        r.guest_nickname = None;
        r.user_id = Some(UserId::stub());
        r.username = Some(String::from("alice"));
        r.avatar_url = Some(String::from("https://example.org/a.png"));
        let c = Comment::from_row(r, true).unwrap();
        assert_eq!(c.author, Author::Registered(UserId::stub()));
        assert_eq!(c.author_name, "alice");
        assert_eq!(c.avatar_url.as_deref(), Some("https://example.org/a.png"));
        assert!(c.liked);
        assert!(c.replies.is_empty());
    }

    #[test]
    fn registered_author_without_username_is_anonymous() {
        let mut r = row(1, None);
        r.guest_nickname = None;
        r.user_id = Some(UserId::stub());
        r.username = Some(String::from("  "));
        let c = Comment::from_row(r, false).unwrap();
        assert_eq!(c.author_name, ANONYMOUS_NAME);
    }

    #[test]
    fn negative_like_count_is_clamped() {
        let mut r = row(1, None);
        r.likes_count = -2;
        assert_eq!(Comment::from_row(r, false).unwrap().likes_count, 0);
    }

    #[test]
    fn row_with_two_authors_is_rejected() {
        let mut r = row(1, None);
        r.user_id = Some(UserId::stub());
        assert!(matches!(
            Comment::from_row(r, false),
            Err(Error::Validation(_))
        ));
    }
}
