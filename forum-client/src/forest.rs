//! Reply trees of a post, built from the backend's flat rows
//!
//! Nodes are shared behind `Arc`s. Every rewrite returns a new forest that
//! reallocates only the nodes on the path from a root to the rewritten node,
//! so untouched subtrees stay `Arc::ptr_eq` to the ones they came from.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    api::{CommentId, CommentRow, Error},
    Comment,
};

pub type Forest = im::Vector<Arc<Comment>>;

/// Assembles flat comments into reply trees
///
/// Roots and siblings keep the order of `nodes`. Comments whose parent is not
/// part of `nodes` are dropped, and so is everything that cannot be reached
/// from a root (which only happens with cyclic parent references). Replies
/// nested more than `max_depth` levels below their root are dropped too, so
/// that `find_in` with the same `max_depth` reaches every built comment.
pub fn build(nodes: impl IntoIterator<Item = Comment>, max_depth: usize) -> Forest {
    let nodes = nodes.into_iter().collect::<Vec<_>>();
    let ids = nodes.iter().map(|c| c.id).collect::<HashSet<_>>();
    let mut roots = Vec::new();
    let mut children = HashMap::<CommentId, Vec<Comment>>::new();
    for c in nodes {
        match c.parent_id {
            None => roots.push(c),
            Some(parent) if ids.contains(&parent) => children.entry(parent).or_default().push(c),
            Some(parent) => tracing::warn!(
                comment = ?c.id,
                ?parent,
                "dropping comment whose parent is not in the thread"
            ),
        }
    }
    let forest = roots
        .into_iter()
        .map(|c| attach(c, &mut children, max_depth))
        .collect::<Forest>();
    if !children.is_empty() {
        tracing::warn!(
            num_comments = children.values().map(Vec::len).sum::<usize>(),
            "dropping comments unreachable from any root"
        );
    }
    forest
}

/// A comment whose replies are being attached
struct Frame {
    node: Comment,
    pending: std::vec::IntoIter<Comment>,
    done: Vec<Arc<Comment>>,
}

impl Frame {
    fn new(node: Comment, children: &mut HashMap<CommentId, Vec<Comment>>) -> Frame {
        Frame {
            pending: children.remove(&node.id).unwrap_or_default().into_iter(),
            done: Vec::new(),
            node,
        }
    }

    fn finish(self) -> Arc<Comment> {
        let mut node = self.node;
        node.replies = self.done.into_iter().collect();
        Arc::new(node)
    }
}

/// Builds the tree under `root` with an explicit stack, reply chains being
/// as long as the backend lets them grow
fn attach(
    root: Comment,
    children: &mut HashMap<CommentId, Vec<Comment>>,
    max_depth: usize,
) -> Arc<Comment> {
    let mut ancestors = Vec::<Frame>::new();
    let mut cur = Frame::new(root, children);
    loop {
        match cur.pending.next() {
            Some(r) if ancestors.len() < max_depth => {
                let next = Frame::new(r, children);
                ancestors.push(std::mem::replace(&mut cur, next));
            }
            Some(r) => {
                let num_comments = drop_subtree(&r, children);
                tracing::warn!(
                    comment = ?r.id,
                    num_comments,
                    max_depth,
                    "dropping replies nested too deep"
                );
            }
            None => {
                let node = cur.finish();
                match ancestors.pop() {
                    Some(mut parent) => {
                        parent.done.push(node);
                        cur = parent;
                    }
                    None => return node,
                }
            }
        }
    }
}

/// Forgets the replies of `c`, returning the size of its subtree
fn drop_subtree(c: &Comment, children: &mut HashMap<CommentId, Vec<Comment>>) -> usize {
    let mut num = 0;
    let mut todo = vec![c.id];
    while let Some(id) = todo.pop() {
        num += 1;
        if let Some(replies) = children.remove(&id) {
            todo.extend(replies.iter().map(|r| r.id));
        }
    }
    num
}

/// Formats `rows` and builds them, `liked` being the comments the viewer likes
///
/// Rows that cannot be formatted are dropped along with their replies.
pub fn from_rows(rows: Vec<CommentRow>, liked: &HashSet<CommentId>, max_depth: usize) -> Forest {
    let nodes = rows.into_iter().filter_map(|row| {
        let id = row.id;
        match Comment::from_row(row, liked.contains(&id)) {
            Ok(c) => Some(c),
            Err(err) => {
                tracing::warn!(comment = ?id, %err, "dropping malformed comment row");
                None
            }
        }
    });
    build(nodes, max_depth)
}

/// Depth-first pre-order search for `id`
///
/// Fails with `MalformedTree` instead of descending more than `max_depth`
/// levels of replies.
pub fn find_in<'a>(
    forest: &'a Forest,
    id: &CommentId,
    max_depth: usize,
) -> Result<Option<&'a Arc<Comment>>, Error> {
    let res = find_at(forest, id, max_depth, 0);
    if let Err(err) = &res {
        tracing::error!(comment = ?id, %err, "comment lookup aborted");
    }
    res
}

fn find_at<'a>(
    forest: &'a Forest,
    id: &CommentId,
    max_depth: usize,
    depth: usize,
) -> Result<Option<&'a Arc<Comment>>, Error> {
    if forest.is_empty() {
        return Ok(None);
    }
    if depth > max_depth {
        return Err(Error::MalformedTree(format!(
            "replies are nested deeper than {max_depth} levels"
        )));
    }
    for c in forest.iter() {
        if c.id == *id {
            return Ok(Some(c));
        }
        if let Some(found) = find_at(&c.replies, id, max_depth, depth + 1)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Rewrites the level holding `id` with `op`, then rebuilds the path up to
/// the roots. `op` receives that level, the index of `id` in it and its
/// depth, and may refuse the rewrite.
fn rewrite<F>(forest: &Forest, id: &CommentId, depth: usize, op: &mut Option<F>) -> Option<Forest>
where
    F: FnOnce(&Forest, usize, usize) -> Option<Forest>,
{
    for (i, c) in forest.iter().enumerate() {
        if c.id == *id {
            return op.take().and_then(|op| op(forest, i, depth));
        }
        if let Some(replies) = rewrite(&c.replies, id, depth + 1, op) {
            let mut parent = (**c).clone();
            parent.replies = replies;
            return Some(forest.update(i, Arc::new(parent)));
        }
    }
    None
}

/// Replaces the comment `id` with `transform(comment)`
///
/// An unknown `id` is not an error: the comment may have been deleted in the
/// meantime. The returned forest then shares every node with `forest`.
pub fn update_in<F>(forest: &Forest, id: &CommentId, transform: F) -> Forest
where
    F: FnOnce(&Comment) -> Comment,
{
    let op = |level: &Forest, i: usize, _: usize| Some(level.update(i, Arc::new(transform(&*level[i]))));
    match rewrite(forest, id, 0, &mut Some(op)) {
        Some(res) => res,
        None => {
            tracing::debug!(comment = ?id, "ignoring update of comment not in forest");
            forest.clone()
        }
    }
}

/// Appends `c` as a root when `parent` is `None`, or as the last reply of
/// `parent`. Returns `None` if `parent` is not in the forest, or if `c` would
/// end up nested more than `max_depth` levels deep.
pub fn insert_in(
    forest: &Forest,
    parent: Option<&CommentId>,
    c: Comment,
    max_depth: usize,
) -> Option<Forest> {
    match parent {
        None => {
            let mut res = forest.clone();
            res.push_back(Arc::new(c));
            Some(res)
        }
        Some(parent) => {
            let op = |level: &Forest, i: usize, depth: usize| {
                if depth >= max_depth {
                    return None;
                }
                let mut p = (*level[i]).clone();
                p.replies.push_back(Arc::new(c));
                Some(level.update(i, Arc::new(p)))
            };
            rewrite(forest, parent, 0, &mut Some(op))
        }
    }
}

/// Removes comment `id` along with all its replies
pub fn remove_in(forest: &Forest, id: &CommentId) -> Option<Forest> {
    let op = |level: &Forest, i: usize, _: usize| {
        let mut res = level.clone();
        res.remove(i);
        Some(res)
    };
    rewrite(forest, id, 0, &mut Some(op))
}

/// All the comments of `forest`, in depth-first pre-order
pub fn flatten<'a>(forest: &'a Forest) -> impl Iterator<Item = &'a Arc<Comment>> + 'a {
    let mut stack = vec![forest.iter()];
    std::iter::from_fn(move || loop {
        let level = stack.last_mut()?;
        match level.next() {
            Some(c) => {
                stack.push(c.replies.iter());
                return Some(c);
            }
            None => {
                stack.pop();
            }
        }
    })
}
