use std::io::Write;

use anyhow::Context;
use chrono::{Duration, TimeZone, Utc};
use forum_api::{CommentId, CommentRow, PostId, UserId, Uuid};
use rand::{seq::SliceRandom, Rng};

const NUM_USERS: usize = 5;
const NUM_POSTS: usize = 3;
const NUM_COMMENTS: usize = 200;

// Chance that a comment replies to an earlier one rather than the post
const REPLY_PROBABILITY: f64 = 0.6;
const GUEST_PROBABILITY: f64 = 0.3;

const MAX_COMMENT_WORDS: usize = 40;
const MAX_LIKES: i64 = 20;

struct User {
    id: UserId,
    username: String,
}

fn gen_word() -> String {
    lipsum::lipsum_words(1)
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn gen_rows<R: Rng>(rng: &mut R) -> Vec<CommentRow> {
    let users = (0..NUM_USERS)
        .map(|_| User {
            id: UserId(Uuid::new_v4()),
            username: gen_word(),
        })
        .collect::<Vec<_>>();
    let posts = (0..NUM_POSTS)
        .map(|_| PostId(Uuid::new_v4()))
        .collect::<Vec<_>>();
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("start date is unambiguous");

    let mut rows: Vec<CommentRow> = Vec::with_capacity(NUM_COMMENTS);
    for i in 0..NUM_COMMENTS {
        let post_id = posts[rng.gen_range(0..posts.len())];
        let parent_id = match rng.gen_bool(REPLY_PROBABILITY) {
            true => rows
                .iter()
                .filter(|r| r.post_id == post_id)
                .collect::<Vec<_>>()
                .choose(rng)
                .map(|r| r.id),
            false => None,
        };
        let (user_id, guest_nickname, username) = match rng.gen_bool(GUEST_PROBABILITY) {
            true => (None, Some(gen_word()), None),
            false => {
                let u = &users[rng.gen_range(0..users.len())];
                (Some(u.id), None, Some(u.username.clone()))
            }
        };
        let created_at = start + Duration::minutes(i as i64 * 7);
        let updated_at = match rng.gen_bool(0.1) {
            true => Some(created_at + Duration::minutes(rng.gen_range(1..120))),
            false => None,
        };
        let num_words = rng.gen_range(1..MAX_COMMENT_WORDS);
        rows.push(CommentRow {
            id: CommentId(Uuid::new_v4()),
            post_id,
            parent_id,
            content: lipsum::lipsum_words(num_words),
            created_at,
            updated_at,
            likes_count: rng.gen_range(0..MAX_LIKES),
            avatar_url: username
                .as_ref()
                .map(|n| format!("https://i.pravatar.cc/150?u={n}")),
            user_id,
            guest_nickname,
            username,
        });
    }
    rows
}

fn main() -> anyhow::Result<()> {
    let rows = gen_rows(&mut rand::thread_rng());
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &rows).context("serializing comment rows")?;
    writeln!(out).context("writing to stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_well_formed() {
        let rows = gen_rows(&mut rand::thread_rng());
        assert_eq!(rows.len(), NUM_COMMENTS);
        for (i, r) in rows.iter().enumerate() {
            assert!(r.author().is_ok());
            assert!(!r.content.trim().is_empty());
            if let Some(parent) = r.parent_id {
                let p = rows[..i]
                    .iter()
                    .find(|p| p.id == parent)
                    .expect("parent is an earlier comment");
                assert_eq!(p.post_id, r.post_id);
            }
        }
    }
}
