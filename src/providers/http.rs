use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::feed::source::{FeedSource, RankingSource};
use crate::feed::types::{DetailRecord, FeedFilter, SummaryPage};

/// REST client for the blog API.
///
/// - `GET {base}/blogs?page=&size=&keyword=&categories=`
/// - `GET {base}/blogs/{id}`
/// - `GET {base}/blogs/top-viewed?limit=`
#[derive(Clone)]
pub struct HttpFeedSource {
    base_url: String,
    client: Client,
}

impl HttpFeedSource {
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("blog-feed-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .context("building http client")?;
        Ok(Self {
            base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn page_query(filter: &FeedFilter, page: u32, page_size: u32) -> Vec<(&'static str, String)> {
        let mut q = vec![("page", page.to_string()), ("size", page_size.to_string())];
        if !filter.query.is_empty() {
            q.push(("keyword", filter.query.clone()));
        }
        if !filter.topics.is_empty() {
            q.push(("categories", filter.topics.join(",")));
        }
        q
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_summary_page(
        &self,
        filter: &FeedFilter,
        page: u32,
        page_size: u32,
    ) -> Result<SummaryPage> {
        let url = format!("{}/blogs", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&Self::page_query(filter, page, page_size))
            .send()
            .await
            .context("blog list get()")?
            .error_for_status()
            .context("blog list status")?
            .text()
            .await
            .context("blog list .text()")?;
        parse_summary_page(&body)
    }

    async fn fetch_detail(&self, id: &str) -> Result<Option<DetailRecord>> {
        let url = format!("{}/blogs/{}", self.base_url, id);
        let resp = self.client.get(&url).send().await.context("blog detail get()")?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp
            .error_for_status()
            .context("blog detail status")?
            .text()
            .await
            .context("blog detail .text()")?;
        parse_detail(&body).map(Some)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[async_trait]
impl RankingSource for HttpFeedSource {
    async fn fetch_top_ranked(&self, n: usize) -> Result<Vec<DetailRecord>> {
        let url = format!("{}/blogs/top-viewed", self.base_url);
        let body = self
            .client
            .get(&url)
            .query(&[("limit", n.to_string())])
            .send()
            .await
            .context("top-viewed get()")?
            .error_for_status()
            .context("top-viewed status")?
            .text()
            .await
            .context("top-viewed .text()")?;
        parse_ranked(&body)
    }
}

pub fn parse_summary_page(s: &str) -> Result<SummaryPage> {
    serde_json::from_str(s).context("parsing blog list payload")
}

pub fn parse_detail(s: &str) -> Result<DetailRecord> {
    serde_json::from_str(s).context("parsing blog detail payload")
}

/// Accepts a bare array or a `{ "content": [...] }` wrapper.
pub fn parse_ranked(s: &str) -> Result<Vec<DetailRecord>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Ranked {
        List(Vec<DetailRecord>),
        Wrapped { content: Vec<DetailRecord> },
    }
    let ranked: Ranked = serde_json::from_str(s).context("parsing top-viewed payload")?;
    Ok(match ranked {
        Ranked::List(v) => v,
        Ranked::Wrapped { content } => content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_skips_empty_filter_parts() {
        let q = HttpFeedSource::page_query(&FeedFilter::default(), 2, 10);
        assert_eq!(q, vec![("page", "2".to_string()), ("size", "10".to_string())]);

        let f = FeedFilter::new("async rust", ["web", "db"]);
        let q = HttpFeedSource::page_query(&f, 0, 5);
        assert!(q.contains(&("keyword", "async rust".to_string())));
        assert!(q.contains(&("categories", "db,web".to_string())));
    }

    #[test]
    fn parses_list_payload() {
        let body = r#"{
            "content": [
                {"id": "a", "title": "Hello", "author": {"id": "u1", "name": "Ann"},
                 "viewCount": 12, "categories": ["rust"], "createdAt": "2024-05-01T10:00:00Z"},
                {"id": null, "title": "broken"}
            ],
            "last": false,
            "totalElements": 42
        }"#;
        let page = parse_summary_page(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].author.name, "Ann");
        assert!(page.items[0].created_at.is_some());
        assert_eq!(page.items[1].id, "");
        assert!(!page.is_last_page);
        assert_eq!(page.total_count, 42);
    }

    #[test]
    fn parses_detail_and_rejects_garbage() {
        let body = r#"{"id": "a", "content": "<p>x</p>", "views": 7, "hashtags": ["t"],
                       "comments": [{"id": "c1", "content": "hi", "parentId": null}],
                       "sensitive": true}"#;
        let d = parse_detail(body).unwrap();
        assert_eq!(d.views, 7);
        assert!(d.sensitive);
        assert_eq!(d.comments.len(), 1);
        assert!(parse_detail("<html>oops</html>").is_err());
    }

    #[test]
    fn ranked_accepts_both_shapes() {
        assert_eq!(parse_ranked(r#"[{"id": "x"}]"#).unwrap().len(), 1);
        assert_eq!(parse_ranked(r#"{"content": [{"id": "x"}, {"id": "y"}]}"#).unwrap().len(), 2);
    }

    #[test]
    fn base_url_is_normalized() {
        let cfg = EngineConfig {
            api_base_url: "https://blog.test/api/".into(),
            ..Default::default()
        };
        let src = HttpFeedSource::from_config(&cfg).unwrap();
        assert_eq!(src.base_url(), "https://blog.test/api");
    }
}
