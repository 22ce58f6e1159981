use chrono::Local;
use serde_json::{Map, json};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agent::{AgentError, generate_session_id, load_system_prompt};
use crate::cache::AdsCache;
use crate::clock::Clock;
use crate::config::constants::prompts;
use crate::config::{AdscopeConfig, AgentConfig, MemoryConfig, PromptConfig};
use crate::facebook::AdsInsightsSource;
use crate::llm::{LLMProvider, LLMRequest, LLMResponse, Message, ToolCall, ToolChoice, Usage};
use crate::memory::{ConversationMemory, MemoryTurn, SessionInfo};
use crate::pricing::{CostCalculator, estimate_tokens_from_text, llm_params};
use crate::storage::Store;
use crate::tools::{FacebookAdsAnalysisTool, ListAvailableClientsTool, ToolRegistry};

/// Shared services an agent is built from
#[derive(Clone)]
pub struct AgentContext {
    pub store: Store,
    pub llm: Arc<dyn LLMProvider>,
    pub insights: Arc<dyn AdsInsightsSource>,
    pub clock: Arc<dyn Clock>,
    pub agent: AgentConfig,
    pub memory: MemoryConfig,
    pub prompt: PromptConfig,
    pub cache_expiration_hours: i64,
}

impl AgentContext {
    pub fn from_config(
        config: &AdscopeConfig,
        store: Store,
        llm: Arc<dyn LLMProvider>,
        insights: Arc<dyn AdsInsightsSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            llm,
            insights,
            clock,
            agent: config.agent.clone(),
            memory: config.memory.clone(),
            prompt: config.prompt.clone(),
            cache_expiration_hours: config.cache.expiration_hours,
        }
    }

    pub fn cache(&self) -> AdsCache {
        AdsCache::new(
            self.store.clone(),
            self.clock.clone(),
            self.cache_expiration_hours,
        )
    }
}

/// The fixed tool set: account listing and ads analysis
pub fn build_tool_registry(context: &AgentContext) -> Result<ToolRegistry, AgentError> {
    let mut registry = ToolRegistry::new();
    registry.register_tool(Arc::new(ListAvailableClientsTool::new(context.store.clone())))?;
    registry.register_tool(Arc::new(FacebookAdsAnalysisTool::new(
        context.insights.clone(),
        context.cache(),
        context.clock.clone(),
    )))?;
    Ok(registry)
}

/// Text form of what was sent to the model, stored with each turn
pub fn render_prompt(system_prompt: &str, messages: &[Message]) -> String {
    let mut rendered = format!("system: {system_prompt}\n");
    for message in messages {
        let _ = writeln!(rendered, "{}: {}", message.role.as_openai_str(), message.content);
    }
    rendered
}

struct TurnOutcome {
    answer: String,
    usage: Usage,
    iterations: usize,
    tool_calls: usize,
    forced_final_answer: bool,
}

pub struct MarketingAgent {
    context: AgentContext,
    user_id: i64,
    system_prompt: String,
    tools: ToolRegistry,
    memory: ConversationMemory,
    calculator: CostCalculator,
}

impl MarketingAgent {
    pub fn new(
        context: AgentContext,
        user_id: i64,
        session_id: Option<String>,
    ) -> Result<Self, AgentError> {
        let session_id = session_id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| {
            let now = context.clock.now().with_timezone(&Local);
            generate_session_id(&user_id.to_string(), now)
        });
        let system_prompt = load_system_prompt(&context.store, &context.prompt);
        let tools = build_tool_registry(&context)?;
        let memory = ConversationMemory::load(
            context.store.clone(),
            context.llm.clone(),
            context.memory.clone(),
            user_id,
            session_id,
        );
        let calculator = CostCalculator::new(context.store.clone(), context.clock.clone());

        info!(user_id, session = %memory.session_id(), "initialized marketing agent");
        Ok(Self {
            context,
            user_id,
            system_prompt,
            tools,
            memory,
            calculator,
        })
    }

    pub fn session_id(&self) -> &str {
        self.memory.session_id()
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.available_tools()
    }

    pub fn session_info(&self) -> SessionInfo {
        self.memory.session_info()
    }

    pub fn conversation_summary(&self) -> String {
        self.memory.conversation_summary()
    }

    pub fn clear_session(&mut self) -> Result<usize, AgentError> {
        Ok(self.memory.clear_session()?)
    }

    /// Answer a user message. Failures become an apology text and nothing is saved.
    pub async fn process_message(&mut self, message: &str) -> String {
        if message.trim().is_empty() {
            warn!(user_id = self.user_id, "invalid message received");
            return prompts::INVALID_MESSAGE_REPLY.to_string();
        }

        let preview: String = message.chars().take(100).collect();
        info!(
            user_id = self.user_id,
            session = %self.session_id(),
            message = %preview,
            "processing message"
        );

        match self.run_turn(message).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, user_id = self.user_id, "error processing message");
                format!("{}: {error}", prompts::ERROR_REPLY_PREFIX)
            }
        }
    }

    async fn run_turn(&mut self, message: &str) -> Result<String, AgentError> {
        let mut messages = self.memory.context_messages();
        messages.push(Message::user(message.to_string()));
        let full_prompt = render_prompt(&self.system_prompt, &messages);

        let outcome = self.drive(messages).await?;
        let answer = if outcome.answer.trim().is_empty() {
            prompts::EMPTY_ANSWER_REPLY.to_string()
        } else {
            outcome.answer.clone()
        };

        let (input_tokens, output_tokens) = if outcome.usage.total_tokens > 0 {
            (
                u64::from(outcome.usage.prompt_tokens),
                u64::from(outcome.usage.completion_tokens),
            )
        } else {
            (
                estimate_tokens_from_text(&full_prompt),
                estimate_tokens_from_text(&answer),
            )
        };
        let model = self.context.llm.model().to_string();
        let cost = self.calculator.calculate_cost(input_tokens, output_tokens, &model);

        let mut extra = Map::new();
        extra.insert("provider".to_string(), json!(self.context.llm.name()));
        extra.insert("max_iterations".to_string(), json!(self.context.agent.max_iterations));
        extra.insert("iterations".to_string(), json!(outcome.iterations));
        extra.insert("tool_calls".to_string(), json!(outcome.tool_calls));
        extra.insert("forced_final_answer".to_string(), json!(outcome.forced_final_answer));
        let params = llm_params(
            &model,
            self.context.agent.temperature,
            self.context.agent.max_tokens,
            extra,
        );

        let turn = MemoryTurn {
            user_prompt: message.to_string(),
            full_prompt_sent: full_prompt,
            llm_response: answer.clone(),
            llm_params: Some(params),
            tokens_used: i64::try_from(input_tokens + output_tokens).ok(),
            estimated_cost_usd: cost,
        };
        if let Err(error) = self.memory.save_turn(turn).await {
            warn!(%error, session = %self.session_id(), "failed to persist conversation turn");
        }

        info!(
            user_id = self.user_id,
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls,
            "generated response"
        );
        Ok(answer)
    }

    /// Tool-calling loop bounded by `max_iterations`, then one forced answer
    async fn drive(&self, mut messages: Vec<Message>) -> Result<TurnOutcome, AgentError> {
        let mut usage = Usage::default();
        let mut tool_calls = 0;
        let max_iterations = self.context.agent.max_iterations.max(1);

        for iteration in 1..=max_iterations {
            let response = self.call_model(&messages, ToolChoice::auto()).await?;
            record_usage(&mut usage, &response);

            if !response.has_tool_calls() {
                return Ok(TurnOutcome {
                    answer: response.content.unwrap_or_default(),
                    usage,
                    iterations: iteration,
                    tool_calls,
                    forced_final_answer: false,
                });
            }

            let calls = response.tool_calls.unwrap_or_default();
            messages.push(Message::assistant_with_tools(
                response.content.unwrap_or_default(),
                calls.clone(),
            ));
            for call in &calls {
                let output = self.run_tool(call).await;
                messages.push(Message::tool_response(call.id.clone(), output));
                tool_calls += 1;
            }
        }

        info!(max_iterations, "iteration limit reached, generating final answer");
        let response = self.call_model(&messages, ToolChoice::none()).await?;
        record_usage(&mut usage, &response);
        Ok(TurnOutcome {
            answer: response.content.unwrap_or_default(),
            usage,
            iterations: max_iterations,
            tool_calls,
            forced_final_answer: true,
        })
    }

    async fn call_model(
        &self,
        messages: &[Message],
        choice: ToolChoice,
    ) -> Result<LLMResponse, AgentError> {
        let request = LLMRequest::new(self.context.llm.model(), messages.to_vec())
            .with_system_prompt(self.system_prompt.clone())
            .with_tools(self.tools.definitions(), choice)
            .with_temperature(self.context.agent.temperature)
            .with_max_tokens(self.context.agent.max_tokens);
        Ok(self.context.llm.generate(request).await?)
    }

    /// Tool output, or the error text when the call fails
    async fn run_tool(&self, call: &ToolCall) -> String {
        let name = call.function.name.as_str();
        let args = match call.parsed_arguments() {
            Ok(args) => args,
            Err(error) => return format!("Error: invalid arguments for {name}: {error}"),
        };
        debug!(tool = name, %args, "calling tool");
        match self.tools.execute_tool(name, args).await {
            Ok(output) => output,
            Err(error) => format!("Error executing {name}: {error}"),
        }
    }
}

fn record_usage(total: &mut Usage, response: &LLMResponse) {
    if let Some(usage) = &response.usage {
        total.accumulate(usage);
    }
}
