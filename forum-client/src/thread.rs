use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;

use crate::{
    api::{Actor, Author, CommentId, Db, Error, Guest, Liker, PostId, Session, UserId},
    forest, Comment, CommentDraft, Config, Forest, LikeState, PendingToggle,
};

/// Comments of one post, as displayed by one view
///
/// Clones share the same state. The forest is replaced wholesale by `fetch`
/// and patched in place by every other operation until the next fetch.
pub struct Thread<D: ?Sized> {
    db: Arc<D>,
    post: PostId,
    config: Config,
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    forest: Forest,

    /// Bumped on every fetch
    generation: u64,

    /// Comments with a like toggle in flight
    pending: HashSet<CommentId>,

    /// Set once the view is gone, after which no result gets applied
    closed: bool,

    guest: Guest,
}

impl<D: ?Sized> Clone for Thread<D> {
    fn clone(&self) -> Thread<D> {
        Thread {
            db: self.db.clone(),
            post: self.post,
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }
}

impl<D: Db + ?Sized> Thread<D> {
    pub fn new(db: Arc<D>, post: PostId, guest: Guest, config: Config) -> Thread<D> {
        Thread {
            db,
            post,
            config,
            state: Arc::new(Mutex::new(State {
                forest: Forest::new(),
                generation: 0,
                pending: HashSet::new(),
                closed: false,
                guest,
            })),
        }
    }

    pub fn post(&self) -> PostId {
        self.post
    }

    pub fn forest(&self) -> Forest {
        self.state.lock().forest.clone()
    }

    pub fn comment(&self, id: &CommentId) -> Result<Option<Arc<Comment>>, Error> {
        let s = self.state.lock();
        let res = forest::find_in(&s.forest, id, self.config.max_depth)?.cloned();
        Ok(res)
    }

    pub fn guest(&self) -> Guest {
        self.state.lock().guest.clone()
    }

    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// The identity operations are performed as
    ///
    /// Registered users must hold a valid session, so that an expired login
    /// is reported instead of silently failing later on.
    pub async fn actor(&self) -> Result<Actor, Error> {
        match self.db.current_identity().await {
            None => Ok(Actor::Guest(self.guest())),
            Some(user) => match self.db.current_session().await {
                Session::Valid => Ok(Actor::Registered(user)),
                Session::Expired => {
                    tracing::info!(?user, "session expired");
                    Err(Error::SessionExpired)
                }
            },
        }
    }

    async fn registered_user(&self) -> Result<UserId, Error> {
        match self.actor().await? {
            Actor::Registered(user) => Ok(user),
            Actor::Guest(_) => Err(Error::PermissionDenied),
        }
    }

    async fn liker(&self) -> Liker {
        match self.db.current_identity().await {
            Some(user) => Liker::User(user),
            None => Liker::Guest(self.guest().id),
        }
    }

    /// Applies `f` to the forest, unless the view is already gone
    fn apply(&self, f: impl FnOnce(&Forest) -> Forest) -> bool {
        let mut s = self.state.lock();
        if s.closed {
            tracing::debug!(post = ?self.post, "view closed, dropping result");
            return false;
        }
        let forest = f(&s.forest);
        s.forest = forest;
        true
    }

    /// Replaces the forest with the backend's current rows
    pub async fn fetch(&self) -> Result<(), Error> {
        let liker = self.liker().await;
        let mut rows = self.db.list_comments(self.post).await?;
        let liked = self
            .db
            .list_liked_comments(&liker, self.post)
            .await?
            .into_iter()
            .collect::<HashSet<_>>();

        let num_rows = rows.len();
        rows.retain(|r| r.post_id == self.post);
        if rows.len() != num_rows {
            tracing::warn!(
                post = ?self.post,
                num_dropped = num_rows - rows.len(),
                "backend returned comments of another post"
            );
        }
        let forest = forest::from_rows(rows, &liked, self.config.max_depth);

        let mut s = self.state.lock();
        if s.closed {
            tracing::debug!(post = ?self.post, "view closed, dropping fetched comments");
            return Ok(());
        }
        s.forest = forest;
        s.generation += 1;
        tracing::debug!(
            post = ?self.post,
            num_roots = s.forest.len(),
            generation = s.generation,
            "fetched comments"
        );
        Ok(())
    }

    /// Posts a comment or reply and appends it to the forest
    pub async fn submit(&self, draft: CommentDraft) -> Result<Comment, Error> {
        draft.validate()?;
        let actor = self.actor().await?;
        let new = draft.into_new_comment(self.post, &actor, &self.config.guest_nickname)?;
        let nickname = match &new.author {
            Author::Guest(n) if *n != self.config.guest_nickname => Some(n.clone()),
            _ => None,
        };

        let row = self.db.insert_comment(new).await?;
        let comment = Comment::from_row(row, false)?;

        if let Some(nickname) = nickname {
            self.state.lock().guest.nickname = Some(nickname);
        }
        let parent = comment.parent_id;
        let inserted = comment.clone();
        let max_depth = self.config.max_depth;
        self.apply(|f| match forest::insert_in(f, parent.as_ref(), inserted, max_depth) {
            Some(res) => res,
            None => {
                tracing::warn!(
                    comment = ?comment.id,
                    ?parent,
                    "new comment has no displayable parent, leaving it for the next fetch"
                );
                f.clone()
            }
        });
        Ok(comment)
    }

    /// Flips the viewer's like on `id`, optimistically
    ///
    /// The local state changes before the backend answers, and is restored
    /// if the backend fails. A second toggle on the same comment while one is
    /// in flight is rejected with `LikePending`.
    pub async fn toggle_like(&self, id: CommentId) -> Result<LikeState, Error> {
        let liker = self.actor().await?.liker();
        let pending = self.begin_toggle(id, liker)?;
        match pending.send(&*self.db).await {
            Ok(()) => {
                self.commit_toggle(&pending);
                Ok(pending.after)
            }
            Err(err) => {
                self.rollback_toggle(&pending, &err);
                Err(err)
            }
        }
    }

    /// Applies a like toggle locally, to be confirmed or rolled back later
    pub fn begin_toggle(&self, id: CommentId, liker: Liker) -> Result<PendingToggle, Error> {
        let mut s = self.state.lock();
        if s.pending.contains(&id) {
            return Err(Error::LikePending(id));
        }
        let before = forest::find_in(&s.forest, &id, self.config.max_depth)?
            .ok_or(Error::UnknownComment(id))?
            .like_state();
        let after = before.toggled();
        let forest = forest::update_in(&s.forest, &id, |c| c.with_like_state(after));
        s.forest = forest;
        s.pending.insert(id);
        Ok(PendingToggle {
            comment: id,
            liker,
            before,
            after,
            generation: s.generation,
        })
    }

    /// Settles `p` as confirmed by the backend
    ///
    /// Comments fetched while `p` was in flight may predate it, in which case
    /// the confirmed like is applied on top of them.
    pub fn commit_toggle(&self, p: &PendingToggle) {
        let mut s = self.state.lock();
        s.pending.remove(&p.comment);
        tracing::debug!(comment = ?p.comment, liked = p.after.liked, "like toggle confirmed");
        if s.closed || s.generation == p.generation {
            return;
        }
        let stale = match forest::find_in(&s.forest, &p.comment, self.config.max_depth) {
            Ok(Some(c)) => c.liked != p.after.liked,
            _ => false,
        };
        if stale {
            let forest = forest::update_in(&s.forest, &p.comment, |c| {
                c.with_like_state(c.like_state().toggled())
            });
            s.forest = forest;
            tracing::debug!(comment = ?p.comment, "reapplied confirmed like over refetched comments");
        }
    }

    /// Restores the exact state from before `p` was begun
    pub fn rollback_toggle(&self, p: &PendingToggle, err: &Error) {
        let mut s = self.state.lock();
        s.pending.remove(&p.comment);
        if s.closed {
            return;
        }
        if s.generation != p.generation {
            tracing::debug!(
                comment = ?p.comment,
                "comments were refetched since the toggle began, not rolling back"
            );
            return;
        }
        let forest = forest::update_in(&s.forest, &p.comment, |c| c.with_like_state(p.before));
        s.forest = forest;
        tracing::warn!(comment = ?p.comment, %err, "rolled back like toggle");
    }

    /// Replaces the content of one of the current user's comments
    pub async fn edit(&self, id: CommentId, content: String) -> Result<(), Error> {
        if content.trim().is_empty() {
            return Err(Error::Validation(String::from("please enter a comment")));
        }
        let user = self.registered_user().await?;
        let updated_at = self.db.update_comment(id, user, content.clone()).await?;
        self.apply(|f| {
            forest::update_in(f, &id, |c| Comment {
                content,
                updated_at: Some(updated_at),
                ..c.clone()
            })
        });
        Ok(())
    }

    /// Deletes one of the current user's comments, with its replies
    pub async fn delete(&self, id: CommentId) -> Result<(), Error> {
        let user = self.registered_user().await?;
        self.db.delete_comment(id, user).await?;
        self.apply(|f| forest::remove_in(f, &id).unwrap_or_else(|| f.clone()));
        Ok(())
    }
}
