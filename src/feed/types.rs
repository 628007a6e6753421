// src/feed/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Opaque, stable identifier of a blog entity.
pub type EntityId = String;

/// Generation counter of one filter configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Epoch(pub u64);

impl Epoch {
    pub const ZERO: Self = Self(0);

    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    #[serde(default, deserialize_with = "nullable_string")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Lightweight projection returned by the paginated list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    /// Null or missing ids deserialize to `""` and are dropped by the store.
    #[serde(default, deserialize_with = "nullable_string")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub excerpt: String,
    #[serde(default)]
    pub author: AuthorSummary,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default, deserialize_with = "nullable_string")]
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub author: AuthorSummary,
    #[serde(default, deserialize_with = "nullable_string")]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fully hydrated entity, keyed by id in the detail cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    #[serde(default, deserialize_with = "nullable_string")]
    pub id: EntityId,
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub content: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default)]
    pub author: AuthorSummary,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub related: Vec<SummaryRecord>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page from the list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPage {
    #[serde(default, alias = "content")]
    pub items: Vec<SummaryRecord>,
    #[serde(default, alias = "last")]
    pub is_last_page: bool,
    #[serde(default, alias = "totalElements")]
    pub total_count: u64,
}

/// Active query parameters, compared by value after normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FeedFilter {
    pub query: String,
    pub topics: Vec<String>,
}

impl FeedFilter {
    /// Trim and collapse whitespace in the query; trim, drop empty, sort and dedup topics.
    pub fn new<Q, I, T>(query: Q, topics: I) -> Self
    where
        Q: AsRef<str>,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
        let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("static regex"));
        let query = re_ws.replace_all(query.as_ref().trim(), " ").to_string();

        let mut topics: Vec<String> = topics
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        topics.sort();
        topics.dedup();

        Self { query, topics }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.topics.is_empty()
    }
}

fn nullable_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_equality_is_by_value() {
        let a = FeedFilter::new("  rust   async ", ["web", "rust", " web "]);
        let b = FeedFilter::new("rust async", vec!["rust".to_string(), "web".to_string()]);
        assert_eq!(a, b);
        assert_eq!(a.topics, vec!["rust".to_string(), "web".to_string()]);
    }

    #[test]
    fn empty_topics_are_dropped() {
        let f = FeedFilter::new("", ["", "   "]);
        assert!(f.is_empty());
    }

    #[test]
    fn null_summary_id_becomes_empty() {
        let json = r#"{"id": null, "title": "t", "viewCount": 3}"#;
        let s: SummaryRecord = serde_json::from_str(json).unwrap();
        assert_eq!(s.id, "");
        assert_eq!(s.view_count, 3);
    }

    #[test]
    fn page_accepts_spring_style_keys() {
        let json = r#"{"content": [{"id": "a"}], "last": true, "totalElements": 7}"#;
        let p: SummaryPage = serde_json::from_str(json).unwrap();
        assert_eq!(p.items.len(), 1);
        assert!(p.is_last_page);
        assert_eq!(p.total_count, 7);
    }

    #[test]
    fn epoch_advances() {
        assert_eq!(Epoch::ZERO.next(), Epoch(1));
        assert_eq!(Epoch(4).next().value(), 5);
    }
}
