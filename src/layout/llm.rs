use async_trait::async_trait;
use tracing::debug;

use super::prompt::build_messages;
use super::response::{into_schedule_tasks, parse_proposed_tasks};
use super::{LayoutError, LayoutStrategy};
use crate::api_connection::endpoints::DEFAULT_MODEL;
use crate::api_connection::{ChatCompletionRequest, Provider, ResponseFormat};
use crate::config::SchedulerConfig;
use crate::schedule::{ScheduleTask, ScheduleTaskRequest, TimeWindow};

/// Places tasks by asking a chat-completion model.
#[derive(Debug, Clone)]
pub struct LlmLayoutStrategy {
    provider: Provider,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmLayoutStrategy {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            provider: Provider::with_base_url(&config.api_base_url, &config.api_key_env_var),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn build_request(&self, tasks: &[ScheduleTaskRequest], window: &TimeWindow) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_messages(tasks, window),
            response_format: Some(ResponseFormat::json_object()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        }
    }
}

#[async_trait]
impl LayoutStrategy for LlmLayoutStrategy {
    async fn propose(
        &self,
        tasks: &[ScheduleTaskRequest],
        window: &TimeWindow,
    ) -> Result<Vec<ScheduleTask>, LayoutError> {
        let request = self.build_request(tasks, window);
        let response = self.provider.call_chat_completion(&request).await?;

        let content = response
            .first_content()
            .ok_or_else(|| LayoutError::MalformedResponse("no content in generator response".to_string()))?;
        debug!(content = %content, "raw layout response");

        into_schedule_tasks(parse_proposed_tasks(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_json_object_mode() {
        let strategy = LlmLayoutStrategy::new(Provider::openai("UNUSED")).with_model("test-model");
        let tasks = vec![ScheduleTaskRequest::new("a", "Soup", 5, 25, vec![])];
        let request = strategy.build_request(&tasks, &TimeWindow::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["max_tokens"], 2000);
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
    }
}
