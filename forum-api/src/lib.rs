use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

pub const STUB_UUID: Uuid = uuid!("ffffffff-ffff-ffff-ffff-ffffffffffff");

mod comment;
pub use comment::{Author, CommentId, CommentRow, NewComment};

mod db;
pub use db::{Db, Session};

mod error;
pub use error::Error;

mod like;
pub use like::{Like, LikeId, LikeTarget, Liker};

mod post;
pub use post::PostId;

mod user;
pub use user::{Actor, Guest, GuestId, UserId};
