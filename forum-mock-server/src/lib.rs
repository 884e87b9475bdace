use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use forum_api::{
    Author, CommentId, CommentRow, Db, Error, Like, LikeId, LikeTarget, Liker, NewComment, PostId,
    Session, Time, UserId, Uuid,
};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// In-memory backend behaving like the hosted one, for tests
pub struct MockServer {
    state: Mutex<State>,

    /// Number of data calls received, identity lookups excluded
    calls: AtomicUsize,

    /// While set, like calls wait before touching the state
    likes_held: AtomicBool,
    likes_waiting: AtomicUsize,
    likes_released: Notify,
}

#[derive(Debug)]
struct State {
    identity: Option<UserId>,
    session: Session,
    offline: bool,
    users: HashMap<UserId, Profile>,
    comments: Vec<CommentRow>,
    likes: Vec<Like>,
}

#[derive(Debug)]
struct Profile {
    username: String,
    avatar_url: Option<String>,
}

impl State {
    fn check_online(&self) -> Result<(), Error> {
        match self.offline {
            true => Err(Error::data_unavailable("backend is offline")),
            false => Ok(()),
        }
    }

    /// Checks that a registered `user` is authenticated right now
    fn check_user(&self, user: UserId) -> Result<(), Error> {
        if self.identity != Some(user) {
            return Err(Error::PermissionDenied);
        }
        match self.session {
            Session::Valid => Ok(()),
            Session::Expired => Err(Error::SessionExpired),
        }
    }

    fn check_liker(&self, liker: &Liker) -> Result<(), Error> {
        match liker {
            Liker::User(user) => self.check_user(*user),
            Liker::Guest(_) => Ok(()),
        }
    }

    fn comment_mut(&mut self, id: CommentId) -> Result<&mut CommentRow, Error> {
        self.comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(Error::UnknownComment(id))
    }

    fn adjust_likes(&mut self, target: LikeTarget, delta: i64) {
        if let LikeTarget::Comment(id) = target {
            if let Ok(c) = self.comment_mut(id) {
                c.likes_count += delta;
            }
        }
    }
}

impl MockServer {
    pub fn new() -> MockServer {
        MockServer {
            state: Mutex::new(State {
                identity: None,
                session: Session::Valid,
                offline: false,
                users: HashMap::new(),
                comments: Vec::new(),
                likes: Vec::new(),
            }),
            calls: AtomicUsize::new(0),
            likes_held: AtomicBool::new(false),
            likes_waiting: AtomicUsize::new(0),
            likes_released: Notify::new(),
        }
    }

    pub fn admin_create_user(&self, username: &str, avatar_url: Option<&str>) -> UserId {
        let id = UserId(Uuid::new_v4());
        self.state.lock().users.insert(
            id,
            Profile {
                username: String::from(username),
                avatar_url: avatar_url.map(String::from),
            },
        );
        id
    }

    pub fn login(&self, user: UserId) {
        let mut s = self.state.lock();
        s.identity = Some(user);
        s.session = Session::Valid;
    }

    pub fn logout(&self) {
        self.state.lock().identity = None;
    }

    pub fn expire_session(&self) {
        self.state.lock().session = Session::Expired;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Inserts rows as-is, without any validation
    pub fn seed_comments(&self, rows: impl IntoIterator<Item = CommentRow>) {
        self.state.lock().comments.extend(rows);
    }

    /// Records a like with no authentication check
    pub fn seed_like(&self, liker: Liker, target: LikeTarget) {
        let mut s = self.state.lock();
        s.likes.push(Like {
            id: LikeId(Uuid::new_v4()),
            liker,
            target,
            created_at: Utc::now(),
        });
        s.adjust_likes(target, 1);
    }

    pub fn test_comment(&self, id: CommentId) -> Option<CommentRow> {
        self.state.lock().comments.iter().find(|c| c.id == id).cloned()
    }

    pub fn test_num_likes(&self, target: LikeTarget) -> usize {
        self.state
            .lock()
            .likes
            .iter()
            .filter(|l| l.target == target)
            .count()
    }

    pub fn test_num_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Makes like calls block until `release_likes`
    pub fn hold_likes(&self) {
        self.likes_held.store(true, Ordering::SeqCst);
    }

    pub fn release_likes(&self) {
        self.likes_held.store(false, Ordering::SeqCst);
        self.likes_released.notify_waiters();
    }

    /// Number of like calls currently blocked by `hold_likes`
    pub fn test_held_like_calls(&self) -> usize {
        self.likes_waiting.load(Ordering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn wait_for_likes_release(&self) {
        self.likes_waiting.fetch_add(1, Ordering::SeqCst);
        loop {
            let released = self.likes_released.notified();
            if !self.likes_held.load(Ordering::SeqCst) {
                break;
            }
            released.await;
        }
        self.likes_waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockServer {
    fn default() -> MockServer {
        MockServer::new()
    }
}

#[async_trait]
impl Db for MockServer {
    async fn current_identity(&self) -> Option<UserId> {
        self.state.lock().identity
    }

    async fn current_session(&self) -> Session {
        self.state.lock().session
    }

    async fn list_comments(&self, post: PostId) -> Result<Vec<CommentRow>, Error> {
        self.record_call();
        let s = self.state.lock();
        s.check_online()?;
        Ok(s.comments
            .iter()
            .filter(|c| c.post_id == post)
            .cloned()
            .collect())
    }

    async fn list_liked_comments(
        &self,
        liker: &Liker,
        post: PostId,
    ) -> Result<Vec<CommentId>, Error> {
        self.record_call();
        let s = self.state.lock();
        s.check_online()?;
        let in_post = s
            .comments
            .iter()
            .filter(|c| c.post_id == post)
            .map(|c| c.id)
            .collect::<HashSet<_>>();
        Ok(s.likes
            .iter()
            .filter(|l| l.liker == *liker)
            .filter_map(|l| match l.target {
                LikeTarget::Comment(c) if in_post.contains(&c) => Some(c),
                _ => None,
            })
            .collect())
    }

    async fn insert_comment(&self, c: NewComment) -> Result<CommentRow, Error> {
        self.record_call();
        let mut s = self.state.lock();
        s.check_online()?;
        c.validate()?;
        if let Some(parent) = c.parent_id {
            match s.comments.iter().find(|p| p.id == parent) {
                Some(p) if p.post_id == c.post_id => (),
                _ => {
                    return Err(Error::Validation(format!(
                        "parent comment {parent:?} is not on post {:?}",
                        c.post_id
                    )))
                }
            }
        }
        let (user_id, guest_nickname, username, avatar_url) = match c.author {
            Author::Registered(user) => {
                s.check_user(user)?;
                let profile = s.users.get(&user);
                (
                    Some(user),
                    None,
                    profile.map(|p| p.username.clone()),
                    profile.and_then(|p| p.avatar_url.clone()),
                )
            }
            Author::Guest(nickname) => (None, Some(nickname), None, None),
        };
        let row = CommentRow {
            id: CommentId(Uuid::new_v4()),
            post_id: c.post_id,
            parent_id: c.parent_id,
            content: c.content,
            created_at: Utc::now(),
            updated_at: None,
            likes_count: 0,
            user_id,
            guest_nickname,
            username,
            avatar_url,
        };
        s.comments.push(row.clone());
        Ok(row)
    }

    async fn update_comment(
        &self,
        id: CommentId,
        author: UserId,
        content: String,
    ) -> Result<Time, Error> {
        self.record_call();
        let mut s = self.state.lock();
        s.check_online()?;
        s.check_user(author)?;
        if content.trim().is_empty() {
            return Err(Error::Validation(String::from("comment content is empty")));
        }
        let c = s.comment_mut(id)?;
        if c.user_id != Some(author) {
            return Err(Error::PermissionDenied);
        }
        let now = Utc::now();
        c.content = content;
        c.updated_at = Some(now);
        Ok(now)
    }

    async fn delete_comment(&self, id: CommentId, author: UserId) -> Result<(), Error> {
        self.record_call();
        let mut s = self.state.lock();
        s.check_online()?;
        s.check_user(author)?;
        if s.comment_mut(id)?.user_id != Some(author) {
            return Err(Error::PermissionDenied);
        }
        // cascade to replies, the way the foreign key does
        let mut removed = HashSet::new();
        removed.insert(id);
        loop {
            let before = removed.len();
            for c in s.comments.iter() {
                if c.parent_id.map(|p| removed.contains(&p)).unwrap_or(false) {
                    removed.insert(c.id);
                }
            }
            if removed.len() == before {
                break;
            }
        }
        s.comments.retain(|c| !removed.contains(&c.id));
        s.likes.retain(|l| match l.target {
            LikeTarget::Comment(c) => !removed.contains(&c),
            LikeTarget::Post(_) => true,
        });
        Ok(())
    }

    async fn insert_like(&self, liker: &Liker, target: LikeTarget) -> Result<(), Error> {
        self.wait_for_likes_release().await;
        self.record_call();
        let mut s = self.state.lock();
        s.check_online()?;
        s.check_liker(liker)?;
        if let LikeTarget::Comment(id) = target {
            s.comment_mut(id)?;
        }
        if s.likes.iter().any(|l| l.liker == *liker && l.target == target) {
            tracing::debug!(?liker, ?target, "like already exists");
            return Ok(());
        }
        s.likes.push(Like {
            id: LikeId(Uuid::new_v4()),
            liker: *liker,
            target,
            created_at: Utc::now(),
        });
        s.adjust_likes(target, 1);
        Ok(())
    }

    async fn delete_like(&self, liker: &Liker, target: LikeTarget) -> Result<(), Error> {
        self.wait_for_likes_release().await;
        self.record_call();
        let mut s = self.state.lock();
        s.check_online()?;
        s.check_liker(liker)?;
        let before = s.likes.len();
        s.likes
            .retain(|l| !(l.liker == *liker && l.target == target));
        if s.likes.len() != before {
            s.adjust_likes(target, -1);
        } else {
            tracing::debug!(?liker, ?target, "like already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_api::{Guest, GuestId};

    fn new_guest_comment(post: PostId, parent: Option<CommentId>) -> NewComment {
        NewComment {
            post_id: post,
            parent_id: parent,
            content: String::from("hello"),
            author: Author::Guest(String::from("Guest")),
        }
    }

    #[tokio::test]
    async fn like_relationship_is_idempotent() {
        let mock = MockServer::new();
        let c = mock
            .insert_comment(new_guest_comment(PostId::stub(), None))
            .await
            .unwrap();
        let liker = Liker::Guest(Guest::generate().id);
        let target = LikeTarget::Comment(c.id);

        mock.insert_like(&liker, target).await.unwrap();
        mock.insert_like(&liker, target).await.unwrap();
        assert_eq!(mock.test_num_likes(target), 1);
        assert_eq!(mock.test_comment(c.id).unwrap().likes_count, 1);

        mock.delete_like(&liker, target).await.unwrap();
        mock.delete_like(&liker, target).await.unwrap();
        assert_eq!(mock.test_num_likes(target), 0);
        assert_eq!(mock.test_comment(c.id).unwrap().likes_count, 0);
    }

    #[tokio::test]
    async fn replies_must_stay_on_their_post() {
        let mock = MockServer::new();
        let c = mock
            .insert_comment(new_guest_comment(PostId::stub(), None))
            .await
            .unwrap();
        let other_post = PostId(Uuid::new_v4());
        assert!(matches!(
            mock.insert_comment(new_guest_comment(other_post, Some(c.id)))
                .await,
            Err(Error::Validation(_))
        ));
        assert!(mock
            .insert_comment(new_guest_comment(PostId::stub(), Some(c.id)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn only_the_author_may_edit_or_delete() {
        let mock = MockServer::new();
        let alice = mock.admin_create_user("alice", None);
        let bob = mock.admin_create_user("bob", None);
        mock.login(alice);
        let c = mock
            .insert_comment(NewComment {
                author: Author::Registered(alice),
                ..new_guest_comment(PostId::stub(), None)
            })
            .await
            .unwrap();
        assert_eq!(c.username.as_deref(), Some("alice"));

        mock.login(bob);
        assert_eq!(
            mock.update_comment(c.id, bob, String::from("mine now"))
                .await,
            Err(Error::PermissionDenied)
        );
        assert_eq!(
            mock.delete_comment(c.id, bob).await,
            Err(Error::PermissionDenied)
        );
        // bob cannot act as alice either
        assert_eq!(
            mock.delete_comment(c.id, alice).await,
            Err(Error::PermissionDenied)
        );
        assert!(mock.test_comment(c.id).is_some());
    }

    #[tokio::test]
    async fn delete_cascades_to_replies_and_likes() {
        let mock = MockServer::new();
        let alice = mock.admin_create_user("alice", None);
        mock.login(alice);
        let root = mock
            .insert_comment(NewComment {
                author: Author::Registered(alice),
                ..new_guest_comment(PostId::stub(), None)
            })
            .await
            .unwrap();
        let reply = mock
            .insert_comment(new_guest_comment(PostId::stub(), Some(root.id)))
            .await
            .unwrap();
        let nested = mock
            .insert_comment(new_guest_comment(PostId::stub(), Some(reply.id)))
            .await
            .unwrap();
        mock.seed_like(Liker::Guest(GuestId::stub()), LikeTarget::Comment(nested.id));

        mock.delete_comment(root.id, alice).await.unwrap();
        assert!(mock.list_comments(PostId::stub()).await.unwrap().is_empty());
        assert_eq!(mock.test_num_likes(LikeTarget::Comment(nested.id)), 0);
    }

    #[tokio::test]
    async fn offline_backend_is_unavailable() {
        let mock = MockServer::new();
        mock.set_offline(true);
        assert!(matches!(
            mock.list_comments(PostId::stub()).await,
            Err(Error::DataUnavailable(_))
        ));
        assert_eq!(mock.current_identity().await, None);
    }
}
