//! HTTP client for the chat service.
//!
//! Questions are posted as form data to the message endpoint. The answer
//! shows up later in the chat history, where it is matched back to the
//! question by its exact text.

use crate::chat::retry::{RetryOutcome, RetryPolicy};
use crate::config::ApiConfig;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from the chat service.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("chat API returned {status} for {url}")]
    Status { url: String, status: StatusCode },

    #[error("no answer yet for question: {0}")]
    AnswerNotReady(String),
}

/// Chat history as returned by the service.
#[derive(Debug, Deserialize)]
struct ChatHistory {
    #[serde(default)]
    messages: Vec<ChatEntry>,
}

/// One question/answer exchange in the history.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEntry {
    pub message: String,
    #[serde(default)]
    pub response: Option<String>,
}

/// Client for one project's chat.
pub struct ChatClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    project_id: String,
    chat_id: String,
}

impl ChatClient {
    /// Create a client from the API settings.
    pub fn new(config: &ApiConfig) -> Result<Self, ChatError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| ChatError::Http {
                url: config.base_url.clone(),
                source,
            })?;

        info!(
            "Chat client for project {} / chat {} at {}",
            config.project_id, config.chat_id, config.base_url
        );

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            project_id: config.project_id.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn message_url(&self) -> String {
        format!("{}/v3/chat/message", self.base_url)
    }

    fn history_url(&self) -> String {
        format!(
            "{}/project/{}/chat/{}?prompt_debug=True",
            self.base_url, self.project_id, self.chat_id
        )
    }

    /// Form fields for submitting a question.
    fn submission_form(&self, question: &str) -> Vec<(&'static str, String)> {
        let metadata = serde_json::json!({
            "files_metadata": [],
            "time": Utc::now().to_rfc3339(),
        });

        vec![
            ("message", question.to_string()),
            ("project_id", self.project_id.clone()),
            ("chat_id", self.chat_id.clone()),
            ("is_test", "false".to_string()),
            ("agent_type", "chat_agent".to_string()),
            ("agent_id", "default_kb_agent".to_string()),
            ("ai_response", "true".to_string()),
            ("is_regenerating", "false".to_string()),
            ("request_metadata", metadata.to_string()),
        ]
    }

    /// Submit a question to the chat.
    pub async fn submit_question(&self, question: &str) -> Result<(), ChatError> {
        let url = self.message_url();
        debug!("Submitting question: {}", question);

        let response = self
            .http_client
            .post(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-API-SECRET", &self.api_secret)
            .form(&self.submission_form(question))
            .send()
            .await
            .map_err(|source| ChatError::Http {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ChatError::Status {
                url,
                status: response.status(),
            });
        }

        Ok(())
    }

    /// Look up the answer to a question in the chat history.
    pub async fn fetch_answer(&self, question: &str) -> Result<ChatEntry, ChatError> {
        let url = self.history_url();

        let response = self
            .http_client
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .header("X-API-SECRET", &self.api_secret)
            .send()
            .await
            .map_err(|source| ChatError::Http {
                url: url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ChatError::Status {
                url,
                status: response.status(),
            });
        }

        let history: ChatHistory = response.json().await.map_err(|source| ChatError::Http {
            url: url.clone(),
            source,
        })?;

        find_answer(&history.messages, question)
            .cloned()
            .ok_or_else(|| ChatError::AnswerNotReady(question.to_string()))
    }

    /// Poll for an answer under `policy`.
    pub async fn wait_for_answer(
        &self,
        question: &str,
        policy: &RetryPolicy,
    ) -> RetryOutcome<String, ChatError> {
        // A question still waiting for its response counts as a failed attempt.
        policy
            .run(|_| async move {
                self.fetch_answer(question)
                    .await?
                    .response
                    .ok_or_else(|| ChatError::AnswerNotReady(question.to_string()))
            })
            .await
    }
}

/// The history entry whose message is exactly `question`.
fn find_answer<'a>(messages: &'a [ChatEntry], question: &str) -> Option<&'a ChatEntry> {
    messages.iter().find(|entry| entry.message == question)
}
