use crate::llm::provider::{
    FinishReason, LLMError, LLMProvider, LLMRequest, LLMResponse, ToolCall, Usage,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Provider that replays queued responses in order and records every request.
///
/// When the queue runs dry it answers with a fixed text, so a conversation can
/// keep going after the interesting part has been scripted.
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<VecDeque<Result<LLMResponse, LLMError>>>,
    requests: Mutex<Vec<LLMRequest>>,
    fallback_text: String,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback_text: "ok".to_string(),
        }
    }

    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }

    /// Queue a plain text answer
    pub fn push_text(&self, text: impl Into<String>) -> &Self {
        self.responses.lock().push_back(Ok(text_response(text.into())));
        self
    }

    /// Queue a response that asks for one tool call
    pub fn push_tool_call(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> &Self {
        let call = ToolCall::function(id.into(), name.into(), arguments.to_string());
        self.responses.lock().push_back(Ok(LLMResponse {
            content: None,
            tool_calls: Some(vec![call]),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            finish_reason: FinishReason::ToolCalls,
        }));
        self
    }

    /// Queue a failure
    pub fn push_error(&self, error: LLMError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

fn text_response(text: String) -> LLMResponse {
    let completion_tokens = (text.len() / 4).max(1) as u32;
    LLMResponse {
        content: Some(text),
        tool_calls: None,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens,
            total_tokens: 10 + completion_tokens,
        }),
        finish_reason: FinishReason::Stop,
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        self.requests.lock().push(request);
        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| Ok(text_response(self.fallback_text.clone())))
    }
}
