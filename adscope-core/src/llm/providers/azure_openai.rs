use crate::config::AzureOpenAIConfig;
use crate::config::constants::azure;
use crate::llm::provider::{
    FinishReason, FunctionCall, LLMError, LLMProvider, LLMRequest, LLMResponse, MessageRole,
    ToolCall, Usage,
};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Chat completions against an Azure OpenAI deployment
pub struct AzureOpenAIProvider {
    http_client: HttpClient,
    api_key: String,
    url: String,
    deployment: String,
}

impl AzureOpenAIProvider {
    pub fn new(config: &AzureOpenAIConfig) -> Result<Self, LLMError> {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LLMError::Network(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(config, http_client)
    }

    pub fn with_client(
        config: &AzureOpenAIConfig,
        http_client: HttpClient,
    ) -> Result<Self, LLMError> {
        if !config.is_complete() {
            return Err(LLMError::Authentication(
                "Azure OpenAI endpoint, api key and deployment name must be configured"
                    .to_string(),
            ));
        }

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            url: config.chat_completions_url(),
            deployment: config.deployment.clone(),
        })
    }

    fn convert_to_openai_format(&self, request: &LLMRequest) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if let Some(system_prompt) = &request.system_prompt {
            messages.push(json!({
                "role": MessageRole::System.as_openai_str(),
                "content": system_prompt
            }));
        }

        for msg in &request.messages {
            let mut message = json!({
                "role": msg.role.as_openai_str(),
                "content": msg.content
            });

            if msg.role == MessageRole::Assistant {
                if let Some(tool_calls) = msg.tool_calls.as_ref().filter(|c| !c.is_empty()) {
                    let tool_calls_json: Vec<Value> = tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.function.name,
                                    "arguments": tc.function.arguments
                                }
                            })
                        })
                        .collect();
                    message["tool_calls"] = Value::Array(tool_calls_json);
                }
            }

            if msg.role == MessageRole::Tool {
                if let Some(tool_call_id) = &msg.tool_call_id {
                    message["tool_call_id"] = Value::String(tool_call_id.clone());
                }
            }

            messages.push(message);
        }

        let mut body = json!({ "messages": messages });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            let tools_json: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.function.name,
                            "description": tool.function.description,
                            "parameters": tool.function.parameters
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools_json);

            if let Some(tool_choice) = &request.tool_choice {
                body["tool_choice"] = tool_choice.to_openai_format();
            }
        }

        body
    }

    fn parse_openai_response(response_json: &Value) -> Result<LLMResponse, LLMError> {
        let choice = response_json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .ok_or_else(|| LLMError::Provider("No choices in response".to_string()))?;

        let message = choice.get("message").ok_or_else(|| {
            LLMError::Provider("Invalid response format: missing message".to_string())
        })?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());

        let tool_calls: Option<Vec<ToolCall>> = message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|call| {
                        let function = call.get("function")?;
                        Some(ToolCall {
                            id: call.get("id")?.as_str()?.to_string(),
                            call_type: "function".to_string(),
                            function: FunctionCall {
                                name: function.get("name")?.as_str()?.to_string(),
                                arguments: function
                                    .get("arguments")
                                    .and_then(|args| args.as_str())
                                    .unwrap_or("{}")
                                    .to_string(),
                            },
                        })
                    })
                    .collect()
            });

        let finish_reason = choice
            .get("finish_reason")
            .and_then(|fr| fr.as_str())
            .map(FinishReason::from_openai)
            .unwrap_or_default();

        let usage = response_json.get("usage").map(|u| {
            let count = |key: &str| u.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("prompt_tokens"),
                completion_tokens: count("completion_tokens"),
                total_tokens: count("total_tokens"),
            }
        });

        Ok(LLMResponse {
            content,
            tool_calls,
            usage,
            finish_reason,
        })
    }
}

fn classify_http_error(status: StatusCode, body: &str) -> LLMError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LLMError::Authentication(format!("HTTP {status}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => LLMError::RateLimit,
        StatusCode::BAD_REQUEST => LLMError::InvalidRequest(format!("HTTP {status}: {body}")),
        _ => LLMError::Provider(format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl LLMProvider for AzureOpenAIProvider {
    fn name(&self) -> &str {
        azure::PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.deployment
    }

    async fn generate(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        self.validate_request(&request)?;
        let body = self.convert_to_openai_format(&request);

        debug!(
            deployment = %self.deployment,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion"
        );

        let response = self
            .http_client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("Azure OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, "Azure OpenAI returned an error");
            return Err(classify_http_error(status, &error_text));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("Failed to parse response: {e}")))?;

        Self::parse_openai_response(&response_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{Message, ToolChoice, ToolDefinition};

    fn config() -> AzureOpenAIConfig {
        AzureOpenAIConfig {
            endpoint: "https://unit.openai.azure.com".to_string(),
            api_key: "key".to_string(),
            deployment: "gpt-4o".to_string(),
            api_version: azure::API_VERSION.to_string(),
        }
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let mut incomplete = config();
        incomplete.api_key.clear();
        assert!(matches!(
            AzureOpenAIProvider::new(&incomplete),
            Err(LLMError::Authentication(_))
        ));
    }

    #[test]
    fn request_body_carries_tool_round_trip() {
        let provider = AzureOpenAIProvider::new(&config()).unwrap();
        let call = ToolCall::function(
            "call_1".into(),
            "list_available_clients".into(),
            r#"{"user_id":"1"}"#.into(),
        );
        let request = LLMRequest::new(
            "gpt-4o",
            vec![
                Message::user("¿Qué cuentas tengo?".to_string()),
                Message::assistant_with_tools(String::new(), vec![call]),
                Message::tool_response("call_1".to_string(), "1. Acme".to_string()),
            ],
        )
        .with_system_prompt("sys")
        .with_tools(
            vec![ToolDefinition::function(
                "list_available_clients".into(),
                "List accounts".into(),
                json!({"type": "object", "properties": {}}),
            )],
            ToolChoice::auto(),
        )
        .with_temperature(0.7);

        let body = provider.convert_to_openai_format(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["tool_calls"][0]["id"], "call_1");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(body["tool_choice"], "auto");
        assert!(body.get("model").is_none());
    }

    #[test]
    fn parses_tool_calls_and_usage() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "facebook_ads_analysis", "arguments": "{\"ad_account_id\":\"act_1\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 14, "total_tokens": 134}
        });

        let parsed = AzureOpenAIProvider::parse_openai_response(&response).unwrap();
        assert!(parsed.content.is_none());
        assert!(parsed.has_tool_calls());
        assert_eq!(parsed.finish_reason, FinishReason::ToolCalls);
        assert_eq!(parsed.usage.unwrap().total_tokens, 134);
    }

    #[test]
    fn empty_choices_is_a_provider_error() {
        let err = AzureOpenAIProvider::parse_openai_response(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, LLMError::Provider(_)));
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            classify_http_error(StatusCode::UNAUTHORIZED, ""),
            LLMError::Authentication(_)
        ));
        assert!(matches!(
            classify_http_error(StatusCode::TOO_MANY_REQUESTS, ""),
            LLMError::RateLimit
        ));
        assert!(matches!(
            classify_http_error(StatusCode::BAD_GATEWAY, "x"),
            LLMError::Provider(_)
        ));
    }
}
