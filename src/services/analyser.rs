use crate::{
    domain::{limit_words, render_prompt, AnalysisResult},
    error::PipelineError,
    services::{ApiKeyPool, ChatEndpoint},
};

/// Classifies article text through the chat endpoint.
///
/// Every call takes the next key from the pool and makes exactly one request.
pub struct Analyser<E: ChatEndpoint> {
    endpoint: E,
    keys: ApiKeyPool,
    max_input_words: usize,
}

impl<E: ChatEndpoint> Analyser<E> {
    pub fn new(endpoint: E, keys: ApiKeyPool, max_input_words: usize) -> Self {
        Analyser {
            endpoint,
            keys,
            max_input_words,
        }
    }

    pub async fn analyze(&self, text: &str) -> Result<AnalysisResult, PipelineError> {
        let api_key = self.keys.next();
        let prompt = render_prompt(&limit_words(text, self.max_input_words));

        let reply = self.endpoint.complete(&prompt, api_key).await?;
        AnalysisResult::parse_reply(&reply)
    }
}
