//! Client for the Semantic Scholar Graph API.
//!
//! Wire models use `#[serde(default)]` for optional fields and
//! `#[serde(rename_all = "camelCase")]` to match API naming.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use pipeline::{IndexError, Keywords, Paper, PaperId, PaperIndex};
use serde::Deserialize;
use tracing::{debug, warn};

/// Base URL of the Semantic Scholar Graph API.
pub const GRAPH_API_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

const SEARCH_FIELDS: &str = "title,abstract,url,openAccessPdf,publicationDate,authors";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Wire models
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperRecord {
    paper_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    r#abstract: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    open_access_pdf: Option<OpenAccessPdf>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    authors: Vec<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    #[serde(default)]
    name: String,
}

impl PaperRecord {
    /// Maps one index record to a domain paper.
    ///
    /// Returns `None` for records without an identifier or abstract; nothing
    /// downstream can screen a paper it cannot read.
    fn into_paper(self) -> Option<Paper> {
        let id = PaperId::new(&self.paper_id)?;
        let abstract_text = self.r#abstract.filter(|a| !a.trim().is_empty())?;
        let published = self
            .publication_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        Some(Paper {
            id,
            title: self.title,
            abstract_text,
            full_text_url: self.open_access_pdf.and_then(|pdf| pdf.url),
            source_url: self.url,
            authors: self.authors.into_iter().map(|a| a.name).collect(),
            published,
        })
    }
}

// ---------------------------------------------------------------------------

/// [`PaperIndex`] implementation over the Semantic Scholar Graph API.
pub struct SemanticScholarIndex {
    http: reqwest::Client,
    base_url: String,
}

impl SemanticScholarIndex {
    /// Builds a client against the public Graph API.
    pub fn new() -> Result<Self, IndexError> {
        Self::with_base_url(GRAPH_API_BASE_URL)
    }

    /// Builds a client against an alternative endpoint (mirrors, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| IndexError::Transport {
                message: format!("building HTTP client: {err}"),
            })?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaperIndex for SemanticScholarIndex {
    async fn search(
        &self,
        keywords: &Keywords,
        max_results: usize,
    ) -> Result<Vec<Paper>, IndexError> {
        let query = keywords.terms().join(" ");
        debug!(%query, max_results, "searching index");
        let response = self
            .http
            .get(format!("{}/paper/search", self.base_url))
            .query(&[
                ("query", query.as_str()),
                ("limit", &max_results.to_string()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .await
            .map_err(|err| IndexError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse =
            response
                .json()
                .await
                .map_err(|err| IndexError::MalformedResponse {
                    message: format!("decoding search response: {err}"),
                })?;

        let total = parsed.data.len();
        let papers: Vec<Paper> = parsed
            .data
            .into_iter()
            .filter_map(PaperRecord::into_paper)
            .collect();
        if papers.len() < total {
            warn!(
                dropped = total - papers.len(),
                "index records without abstracts were dropped"
            );
        }
        Ok(papers)
    }

    async fn fetch_full_text(&self, paper: &Paper) -> Result<String, IndexError> {
        let url = paper.full_text_url.as_deref().ok_or(IndexError::NoFullText)?;
        debug!(paper_id = %paper.id, url, "fetching full text");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| IndexError::Transport {
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Api {
                status: status.as_u16(),
                message: format!("fetching full text from {url}"),
            });
        }
        let text = response.text().await.map_err(|err| IndexError::Transport {
            message: err.to_string(),
        })?;
        if text.trim().is_empty() {
            return Err(IndexError::NoFullText);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> PaperRecord {
        serde_json::from_value(value).expect("record decodes")
    }

    #[test]
    fn full_record_maps_to_domain_paper() {
        let paper = record(json!({
            "paperId": "649def34f8be52c8b66281af98ae884c09aef38b",
            "title": "Attention Is All You Need",
            "abstract": "The dominant sequence transduction models...",
            "url": "https://www.semanticscholar.org/paper/649def34",
            "openAccessPdf": {"url": "https://arxiv.org/pdf/1706.03762", "status": "GREEN"},
            "publicationDate": "2017-06-12",
            "authors": [{"authorId": "1", "name": "A. Vaswani"}]
        }))
        .into_paper()
        .expect("complete record maps");

        assert_eq!(paper.id.as_str(), "649def34f8be52c8b66281af98ae884c09aef38b");
        assert_eq!(paper.title, "Attention Is All You Need");
        assert_eq!(
            paper.full_text_url.as_deref(),
            Some("https://arxiv.org/pdf/1706.03762")
        );
        assert_eq!(
            paper.published,
            NaiveDate::from_ymd_opt(2017, 6, 12)
        );
        assert_eq!(paper.authors, ["A. Vaswani"]);
    }

    #[test]
    fn record_without_abstract_is_dropped() {
        let mapped = record(json!({
            "paperId": "abc",
            "title": "No Abstract Here",
            "abstract": null
        }))
        .into_paper();
        assert!(mapped.is_none());
    }

    #[test]
    fn sparse_record_still_maps() {
        let paper = record(json!({
            "paperId": "abc",
            "abstract": "Something."
        }))
        .into_paper()
        .expect("sparse record maps");
        assert!(paper.full_text_url.is_none());
        assert!(paper.published.is_none());
        assert!(paper.authors.is_empty());
    }

    #[test]
    fn unparseable_dates_become_none() {
        let paper = record(json!({
            "paperId": "abc",
            "abstract": "Something.",
            "publicationDate": "2017"
        }))
        .into_paper()
        .expect("record maps");
        assert!(paper.published.is_none());
    }

    #[test]
    fn search_response_tolerates_missing_data() {
        let parsed: SearchResponse =
            serde_json::from_value(json!({"total": 0, "offset": 0})).expect("decodes");
        assert!(parsed.data.is_empty());
    }
}
