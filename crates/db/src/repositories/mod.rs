//! Repository layer for database operations.

mod comment;
mod following;
mod notification;
mod post;
mod report;
mod user;

pub use comment::{CommentFilter, CommentRepository};
pub use following::FollowingRepository;
pub use notification::NotificationRepository;
pub use post::{PostFilter, PostRepository, PostSort};
pub use report::ReportRepository;
pub use user::UserRepository;

use std::collections::{BTreeMap, BTreeSet};

/// Likers grouped by target id.
pub type LikeMap = BTreeMap<String, Vec<String>>;

/// Reactions of a single target: emoji to the set of reacting user ids.
pub type ReactionMap = BTreeMap<String, BTreeSet<String>>;

/// Reactions grouped by target id.
pub type ReactionsByTarget = BTreeMap<String, ReactionMap>;

/// Group `(target_id, user_id)` rows into a like map.
fn group_likes(rows: impl IntoIterator<Item = (String, String)>) -> LikeMap {
    let mut map = LikeMap::new();
    for (target_id, user_id) in rows {
        map.entry(target_id).or_default().push(user_id);
    }
    map
}

/// Group `(target_id, user_id, emoji)` rows into per-target reaction maps.
fn group_reactions(rows: impl IntoIterator<Item = (String, String, String)>) -> ReactionsByTarget {
    let mut map = ReactionsByTarget::new();
    for (target_id, user_id, emoji) in rows {
        map.entry(target_id)
            .or_default()
            .entry(emoji)
            .or_default()
            .insert(user_id);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_likes() {
        let map = group_likes([
            ("p1".to_string(), "u1".to_string()),
            ("p1".to_string(), "u2".to_string()),
            ("p2".to_string(), "u1".to_string()),
        ]);
        assert_eq!(map["p1"], vec!["u1", "u2"]);
        assert_eq!(map["p2"], vec!["u1"]);
    }

    #[test]
    fn test_group_reactions_is_a_set_per_emoji() {
        let map = group_reactions([
            ("p1".to_string(), "u1".to_string(), "🎉".to_string()),
            ("p1".to_string(), "u1".to_string(), "🎉".to_string()),
            ("p1".to_string(), "u1".to_string(), "❤".to_string()),
            ("p1".to_string(), "u2".to_string(), "🎉".to_string()),
        ]);
        let post = &map["p1"];
        assert_eq!(post.len(), 2);
        assert_eq!(post["🎉"].len(), 2);
        assert!(post["❤"].contains("u1"));
    }
}
