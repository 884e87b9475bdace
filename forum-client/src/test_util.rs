use chrono::TimeZone;

use crate::{
    api::{CommentId, CommentRow, PostId, Time, Uuid},
    Comment,
};

pub fn id(i: u128) -> CommentId {
    CommentId(Uuid::from_u128(i))
}

pub fn time(i: u128) -> Time {
    chrono::Utc
        .timestamp_opt(1_700_000_000 + i as i64, 0)
        .single()
        .expect("test timestamp out of range")
}

/// Guest-authored row number `i`
pub fn row(i: u128, parent: Option<u128>) -> CommentRow {
    CommentRow {
        id: id(i),
        post_id: PostId::stub(),
        parent_id: parent.map(id),
        content: format!("comment {i}"),
        created_at: time(i),
        updated_at: None,
        likes_count: 0,
        user_id: None,
        guest_nickname: Some(format!("guest {i}")),
        username: None,
        avatar_url: None,
    }
}

pub fn node(i: u128, parent: Option<u128>) -> Comment {
    Comment::from_row(row(i, parent), false).expect("test row is well-formed")
}

pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }
}
