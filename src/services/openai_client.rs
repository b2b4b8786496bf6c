use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;

use crate::{configuration::AnalysisSettings, error::PipelineError};

/// A single-turn chat completion call made with a caller supplied key.
#[async_trait]
pub trait ChatEndpoint: Send + Sync + 'static {
    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, PipelineError>;
}

/// OpenAI compatible chat endpoint.
pub struct OpenaiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

impl OpenaiClient {
    pub fn new(settings: &AnalysisSettings) -> Self {
        OpenaiClient {
            http: reqwest::Client::new(),
            api_base: settings.api_base.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_output_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
        }
    }

    fn client_for(&self, api_key: &str) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&self.api_base);

        Client::with_config(config)
            .with_http_client(self.http.clone())
            .with_backoff(single_attempt())
    }
}

/// The client retries rate limits and server errors on its own by default.
/// Retrying is the caller's decision here, so give up after the first try.
fn single_attempt() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoff {
        max_elapsed_time: Some(Duration::ZERO),
        ..Default::default()
    }
}

#[async_trait]
impl ChatEndpoint for OpenaiClient {
    async fn complete(&self, prompt: &str, api_key: &str) -> Result<String, PipelineError> {
        let unavailable = |e: async_openai::error::OpenAIError| {
            PipelineError::AnalysisUnavailable(e.to_string())
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(unavailable)?
                .into()])
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .top_p(self.top_p)
            .build()
            .map_err(unavailable)?;

        let response = self
            .client_for(api_key)
            .chat()
            .create(request)
            .await
            .map_err(unavailable)?;
        log::debug!("Analysis response: {:?}", response);

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(PipelineError::AnalysisParseError {
                reason: "no content in reply",
                reply: String::new(),
            })
    }
}
