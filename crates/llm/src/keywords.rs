//! Keyword extraction over a [`LanguageModel`].

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{CompletionRequest, Keywords, KeywordSource, LanguageModel, ProviderError, ProviderName};
use serde::Deserialize;

const SYSTEM_PROMPT: &str = "You are a scientific research expert. Extract the most relevant \
    keywords from the given research question. Return them as a JSON object with a 'keywords' \
    array, e.g. {\"keywords\": [\"keyword1\", \"keyword2\"]}. \
    Limit to 5-7 most relevant keywords.";

#[derive(Debug, Deserialize)]
struct KeywordDocument {
    #[serde(default)]
    keywords: Vec<String>,
}

/// Derives index search keywords from a research question via one completion
/// call.
pub struct LlmKeywordSource {
    model: Arc<dyn LanguageModel>,
}

impl LlmKeywordSource {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl KeywordSource for LlmKeywordSource {
    fn name(&self) -> &ProviderName {
        self.model.name()
    }

    async fn extract(&self, question: &str) -> Result<Keywords, ProviderError> {
        let request = CompletionRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: question.to_string(),
            json_response: true,
        };
        let value = self.model.complete(request).await?;
        let document: KeywordDocument =
            serde_json::from_value(value).map_err(|err| ProviderError::MalformedResponse {
                message: format!("keyword document: {err}"),
            })?;
        Keywords::new(document.keywords).ok_or_else(|| ProviderError::MalformedResponse {
            message: "keyword document contained no usable terms".into(),
        })
    }
}
