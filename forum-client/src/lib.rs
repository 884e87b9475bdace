mod comment;
pub use comment::Comment;

mod config;
pub use config::Config;

mod draft;
pub use draft::CommentDraft;

pub mod forest;
pub use forest::Forest;

mod like;
pub use like::{LikeState, PendingToggle};

mod thread;
pub use thread::Thread;

pub mod api {
    pub use forum_api::*;
}

#[cfg(test)]
pub(crate) mod test_util;
