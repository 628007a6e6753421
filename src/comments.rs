//! comments.rs — one-level threading of a detail's flat comment list.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::feed::types::Comment;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentThread {
    pub root: Comment,
    pub replies: Vec<Comment>,
}

/// Group comments by `parent_id`. Roots and replies keep their input order;
/// a reply whose parent is not in the list becomes a root.
pub fn thread(comments: &[Comment]) -> Vec<CommentThread> {
    let ids: HashSet<&str> = comments.iter().map(|c| c.id.as_str()).collect();
    let is_root = |c: &Comment| match c.parent_id.as_deref() {
        Some(p) if !p.is_empty() && p != c.id => !ids.contains(p),
        _ => true,
    };

    let mut threads = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for c in comments.iter().filter(|&c| is_root(c)) {
        index.insert(c.id.as_str(), threads.len());
        threads.push(CommentThread {
            root: c.clone(),
            replies: Vec::new(),
        });
    }

    for c in comments.iter().filter(|&c| !is_root(c)) {
        // Replies to replies attach to the thread of their nearest known root.
        let mut parent = c.parent_id.as_deref().unwrap_or_default();
        let mut hops = 0;
        while !index.contains_key(parent) && hops < comments.len() {
            parent = comments
                .iter()
                .find(|p| p.id == parent)
                .and_then(|p| p.parent_id.as_deref())
                .unwrap_or_default();
            hops += 1;
        }
        match index.get(parent) {
            Some(&i) => threads[i].replies.push(c.clone()),
            None => threads.push(CommentThread {
                root: c.clone(),
                replies: Vec::new(),
            }),
        }
    }
    threads
}
