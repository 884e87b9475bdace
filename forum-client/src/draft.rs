use crate::api::{Actor, Author, CommentId, Error, NewComment, PostId};

/// What the comment form holds when the user presses submit
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentDraft {
    pub content: String,

    /// Comment being replied to, `None` for a top-level comment
    pub parent: Option<CommentId>,

    /// Only used for guests
    pub nickname: Option<String>,
}

impl CommentDraft {
    pub fn new(content: impl Into<String>) -> CommentDraft {
        CommentDraft {
            content: content.into(),
            ..CommentDraft::default()
        }
    }

    pub fn reply_to(parent: CommentId, content: impl Into<String>) -> CommentDraft {
        CommentDraft {
            content: content.into(),
            parent: Some(parent),
            nickname: None,
        }
    }

    pub fn with_nickname(self, nickname: impl Into<String>) -> CommentDraft {
        CommentDraft {
            nickname: Some(nickname.into()),
            ..self
        }
    }

    /// Rejects blank content before anything reaches the network
    pub fn validate(&self) -> Result<(), Error> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation(String::from("please enter a comment")));
        }
        Ok(())
    }

    /// Resolves the author: registered users are never given a nickname, and
    /// guests fall back to their remembered nickname then to `placeholder`
    pub fn into_new_comment(
        self,
        post_id: PostId,
        actor: &Actor,
        placeholder: &str,
    ) -> Result<NewComment, Error> {
        self.validate()?;
        let author = match actor {
            Actor::Registered(user) => Author::Registered(*user),
            Actor::Guest(guest) => Author::Guest(
                non_blank(self.nickname)
                    .or_else(|| non_blank(guest.nickname.clone()))
                    .unwrap_or_else(|| String::from(placeholder)),
            ),
        };
        Ok(NewComment {
            post_id,
            parent_id: self.parent,
            content: self.content,
            author,
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
