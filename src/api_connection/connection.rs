use dotenv::dotenv;
use reqwest::Client;
use std::env;
use thiserror::Error;
use tracing::{debug, warn};

use super::endpoints::{ChatCompletionRequest, ChatCompletionResponse, Provider, OPENAI_BASE_URL};

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

impl Provider {
    pub fn openai(api_key_env_var_name: &str) -> Self {
        Self::with_base_url(OPENAI_BASE_URL, api_key_env_var_name)
    }

    pub fn with_base_url(base_url: &str, api_key_env_var_name: &str) -> Self {
        dotenv().ok();
        Self::OpenAiCompatible {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_env_var: api_key_env_var_name.to_string(),
        }
    }

    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            Provider::OpenAiCompatible {
                base_url,
                api_key_env_var,
            } => {
                let actual_api_key = env::var(api_key_env_var)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var.clone()))?;

                let client = Client::new();
                let url = format!("{}/chat/completions", base_url);
                debug!(%url, model = %request.model, messages = request.messages.len(), "sending chat completion");

                let response = client
                    .post(&url)
                    .bearer_auth(actual_api_key)
                    .header("Content-Type", "application/json")
                    .json(request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let chat_response = response.json::<ChatCompletionResponse>().await?;
                    Ok(chat_response)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    warn!(%status, "chat completion request rejected");
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::endpoints::ChatMessage;

    #[tokio::test]
    async fn test_missing_api_key_error() {
        let provider = Provider::openai("THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_PREP_SCHEDULE");
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage::user("Hello")],
            response_format: None,
            temperature: None,
            max_tokens: None,
        };
        let result = provider.call_chat_completion(&request).await;
        match result {
            Err(ApiConnectionError::MissingApiKey(key_name)) => {
                assert_eq!(key_name, "THIS_KEY_SHOULD_NOT_EXIST_IN_ENV_PREP_SCHEDULE")
            }
            other => panic!("expected MissingApiKey, got {:?}", other),
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let Provider::OpenAiCompatible { base_url, .. } =
            Provider::with_base_url("http://localhost:8080/v1/", "KEY");
        assert_eq!(base_url, "http://localhost:8080/v1");
    }
}
