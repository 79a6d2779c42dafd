use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The issue backing a comment thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub comments: u32,
    #[serde(default)]
    pub locked: bool,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorAssociation {
    Collaborator,
    Contributor,
    Member,
    Owner,
    FirstTimeContributor,
    FirstTimer,
    Mannequin,
    #[default]
    #[serde(other)]
    None,
}

impl AuthorAssociation {
    /// Badge text shown next to the author; empty means no badge.
    pub fn label(&self) -> &'static str {
        match self {
            AuthorAssociation::Collaborator => "Collaborator",
            AuthorAssociation::Contributor => "Contributor",
            AuthorAssociation::Member => "Member",
            AuthorAssociation::Owner => "Owner",
            AuthorAssociation::FirstTimeContributor => "First time contributor",
            AuthorAssociation::FirstTimer => "First timer",
            AuthorAssociation::Mannequin | AuthorAssociation::None => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    PlusOne,
    MinusOne,
    Laugh,
    Hooray,
    Confused,
    Heart,
    Rocket,
    Eyes,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 8] = [
        ReactionKind::PlusOne,
        ReactionKind::MinusOne,
        ReactionKind::Laugh,
        ReactionKind::Hooray,
        ReactionKind::Confused,
        ReactionKind::Heart,
        ReactionKind::Rocket,
        ReactionKind::Eyes,
    ];

    pub fn as_api_str(&self) -> &'static str {
        match self {
            ReactionKind::PlusOne => "+1",
            ReactionKind::MinusOne => "-1",
            ReactionKind::Laugh => "laugh",
            ReactionKind::Hooray => "hooray",
            ReactionKind::Confused => "confused",
            ReactionKind::Heart => "heart",
            ReactionKind::Rocket => "rocket",
            ReactionKind::Eyes => "eyes",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            ReactionKind::PlusOne => "👍",
            ReactionKind::MinusOne => "👎",
            ReactionKind::Laugh => "😄",
            ReactionKind::Hooray => "🎉",
            ReactionKind::Confused => "😕",
            ReactionKind::Heart => "❤️",
            ReactionKind::Rocket => "🚀",
            ReactionKind::Eyes => "👀",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReactionKind::PlusOne => "Thumbs up",
            ReactionKind::MinusOne => "Thumbs down",
            ReactionKind::Laugh => "Laugh",
            ReactionKind::Hooray => "Hooray",
            ReactionKind::Confused => "Confused",
            ReactionKind::Heart => "Heart",
            ReactionKind::Rocket => "Rocket",
            ReactionKind::Eyes => "Eyes",
        };
        write!(f, "{} {}", self.emoji(), name)
    }
}

/// Reaction rollup attached to a comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub total_count: u64,
    #[serde(rename = "+1", default)]
    pub plus_one: u64,
    #[serde(rename = "-1", default)]
    pub minus_one: u64,
    #[serde(default)]
    pub laugh: u64,
    #[serde(default)]
    pub hooray: u64,
    #[serde(default)]
    pub confused: u64,
    #[serde(default)]
    pub heart: u64,
    #[serde(default)]
    pub rocket: u64,
    #[serde(default)]
    pub eyes: u64,
}

impl Reactions {
    pub fn count(&self, kind: ReactionKind) -> u64 {
        match kind {
            ReactionKind::PlusOne => self.plus_one,
            ReactionKind::MinusOne => self.minus_one,
            ReactionKind::Laugh => self.laugh,
            ReactionKind::Hooray => self.hooray,
            ReactionKind::Confused => self.confused,
            ReactionKind::Heart => self.heart,
            ReactionKind::Rocket => self.rocket,
            ReactionKind::Eyes => self.eyes,
        }
    }

    /// Sum over the known reaction kinds (the API's `total_count` may lag).
    pub fn sum(&self) -> u64 {
        ReactionKind::ALL.iter().map(|k| self.count(*k)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    pub user: User,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    #[serde(default)]
    pub reactions: Reactions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_comment_payload() {
        let json = r#"{
            "id": 42,
            "user": {"login": "octocat", "avatar_url": "https://a/1", "html_url": "https://github.com/octocat"},
            "body_html": "<p>hi</p>",
            "html_url": "https://github.com/o/r/issues/1#issuecomment-42",
            "author_association": "FIRST_TIME_CONTRIBUTOR",
            "reactions": {"url": "https://api/r", "total_count": 3, "+1": 2, "-1": 0, "laugh": 0,
                          "hooray": 0, "confused": 0, "heart": 1, "rocket": 0, "eyes": 0},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }"#;
        let comment: IssueComment = serde_json::from_str(json).unwrap();
        assert_eq!(comment.id, 42);
        assert_eq!(comment.user.login, "octocat");
        assert_eq!(
            comment.author_association,
            AuthorAssociation::FirstTimeContributor
        );
        assert_eq!(comment.reactions.count(ReactionKind::PlusOne), 2);
        assert_eq!(comment.reactions.sum(), 3);
    }

    #[test]
    fn unknown_association_maps_to_none() {
        let assoc: AuthorAssociation = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(assoc, AuthorAssociation::None);
        assert_eq!(assoc.label(), "");
    }

    #[test]
    fn issue_without_locked_defaults_to_unlocked() {
        let issue: Issue = serde_json::from_str(
            r#"{"number": 7, "comments": 3, "html_url": "https://github.com/o/r/issues/7"}"#,
        )
        .unwrap();
        assert!(!issue.locked);
        assert_eq!(issue.comments, 3);
    }
}
