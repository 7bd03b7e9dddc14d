//! Agent: a model backend fused with the tool capabilities discovered at
//! construction time. Immutable once built; switching models or tools means
//! building a new agent.

use crate::application::tooling::{ToolCapability, ToolInvokeError, ToolInvoker};
use crate::domain::types::{ChatMessage, Completion, MessageRole};
use crate::infrastructure::model::{ModelBackend, ModelError, ModelRequest};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bound on tool interactions within a single generation.
const MAX_TOOL_STEPS: u32 = 5;

const DIRECTIVE_GUIDANCE: &str = "To call a tool, reply with exactly one JSON object of the form \
{\"tool\": \"<name>\", \"arguments\": {...}} and nothing else. \
After a tool result is provided, either call another tool or reply with your final answer as plain text.";

const DEGRADED_INSTRUCTION: &str = "You are a helpful assistant for the x402 resource server. \
Tool access is currently unavailable, so you cannot fetch live data. \
When a request would need the resource server, apologise and explain that the service cannot be reached right now.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("generation exceeded the maximum of {max_steps} tool interactions")]
    StepLimit { max_steps: u32 },
}

#[derive(Debug, PartialEq)]
enum Directive {
    Final(String),
    CallTool { tool: String, arguments: Value },
}

pub struct Agent {
    backend: Box<dyn ModelBackend>,
    model: String,
    system_instruction: String,
    tools: HashMap<String, ToolCapability>,
    invoker: Option<Arc<dyn ToolInvoker>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Full agent: model plus every capability the tool provider listed.
    pub fn with_tools(
        backend: Box<dyn ModelBackend>,
        tools: HashMap<String, ToolCapability>,
        invoker: Arc<dyn ToolInvoker>,
    ) -> Self {
        let model = backend.default_model().to_string();
        let system_instruction = compose_tool_instruction(&tools);
        Self {
            backend,
            model,
            system_instruction,
            tools,
            invoker: Some(invoker),
        }
    }

    /// Fallback agent built when tool discovery fails: no capabilities, and a
    /// system instruction telling the model tool access is unavailable.
    pub fn degraded(backend: Box<dyn ModelBackend>) -> Self {
        let model = backend.default_model().to_string();
        Self {
            backend,
            model,
            system_instruction: DEGRADED_INSTRUCTION.to_string(),
            tools: HashMap::new(),
            invoker: None,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn is_degraded(&self) -> bool {
        self.invoker.is_none()
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Produce a completion for one prompt. Performs no shared-state mutation;
    /// concurrent calls are independent.
    pub async fn generate(&self, prompt: &str) -> Result<Completion, GenerationError> {
        let mut messages = vec![
            ChatMessage::new(MessageRole::System, self.system_instruction.clone()),
            ChatMessage::new(MessageRole::User, prompt),
        ];
        let mut used_tool_count = 0u32;
        let mut token_usage: Option<u32> = None;
        let mut remaining_steps = MAX_TOOL_STEPS;

        loop {
            let response = self
                .backend
                .chat(ModelRequest {
                    model: self.model.clone(),
                    messages: messages.clone(),
                })
                .await?;
            token_usage = accumulate(token_usage, response.token_usage);
            let content = response.message.content;

            match parse_directive(&content) {
                Directive::Final(text) => {
                    info!(used_tool_count, "Generation finished");
                    return Ok(Completion {
                        text,
                        used_tool_count,
                        token_usage,
                    });
                }
                Directive::CallTool { tool, arguments } => {
                    if remaining_steps == 0 {
                        warn!(tool = tool.as_str(), "Tool step budget exhausted");
                        return Err(GenerationError::StepLimit {
                            max_steps: MAX_TOOL_STEPS,
                        });
                    }
                    remaining_steps -= 1;

                    messages.push(ChatMessage::new(MessageRole::Assistant, content));
                    let result = self.run_tool(&tool, arguments, &mut used_tool_count).await;
                    messages.push(ChatMessage::new(MessageRole::User, result.to_string()));
                }
            }
        }
    }

    async fn run_tool(&self, tool: &str, arguments: Value, used_tool_count: &mut u32) -> Value {
        let outcome = match (&self.invoker, self.tools.contains_key(tool)) {
            (Some(invoker), true) => {
                *used_tool_count += 1;
                info!(tool, "Agent requested tool execution");
                invoker.invoke_tool(tool, arguments.clone()).await
            }
            _ => Err(ToolInvokeError::UnknownTool {
                tool: tool.to_string(),
            }),
        };

        match outcome {
            Ok(output) => json!({
                "tool_result": {
                    "tool": tool,
                    "input": arguments,
                    "success": true,
                    "output": flatten_tool_output(output),
                }
            }),
            Err(error) => {
                warn!(tool, %error, "Tool execution failed");
                json!({
                    "tool_result": {
                        "tool": tool,
                        "input": arguments,
                        "success": false,
                        "message": error.to_string(),
                    }
                })
            }
        }
    }
}

/// Providers wrap results in `content: [{type: "text", text}]`. Collapse that
/// shape to the joined text; pass anything else through untouched.
fn flatten_tool_output(output: Value) -> Value {
    let Some(entries) = output.get("content").and_then(Value::as_array) else {
        return output;
    };
    let texts: Vec<&str> = entries
        .iter()
        .filter_map(|entry| entry.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        return output;
    }
    Value::String(texts.join("\n"))
}

fn accumulate(total: Option<u32>, step: Option<u32>) -> Option<u32> {
    match (total, step) {
        (Some(a), Some(b)) => Some(a + b),
        (None, step) => step,
        (total, None) => total,
    }
}

fn compose_tool_instruction(tools: &HashMap<String, ToolCapability>) -> String {
    let mut text = String::from(
        "You are a helpful assistant for the x402 resource server. \
These tools are available to you:\n",
    );
    let mut names: Vec<&String> = tools.keys().collect();
    names.sort();
    for name in names {
        let description = tools[name]
            .description
            .as_deref()
            .unwrap_or("No description.");
        text.push_str(&format!("- {name}: {description}\n"));
    }
    text.push_str(
        "When the resource server holds data relevant to a request, \
prefer calling a tool over fabricating an answer.\n\n",
    );
    text.push_str(DIRECTIVE_GUIDANCE);
    text
}

fn parse_directive(content: &str) -> Directive {
    let stripped = strip_code_fence(content.trim());
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(stripped) {
        if let Some(tool) = object.get("tool").and_then(Value::as_str) {
            let arguments = object
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default()));
            return Directive::CallTool {
                tool: tool.to_string(),
                arguments,
            };
        }
        if let Some(response) = object.get("response").and_then(Value::as_str) {
            debug!("Model wrapped its final answer in a response object");
            return Directive::Final(response.to_string());
        }
    }
    Directive::Final(content.trim().to_string())
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.strip_suffix("```").map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::model::ModelResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct ScriptedBackend {
        replies: Mutex<VecDeque<ModelResponse>>,
        requests: Arc<Mutex<Vec<ModelRequest>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<ModelResponse>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn request_log(&self) -> Arc<Mutex<Vec<ModelRequest>>> {
            self.requests.clone()
        }

        fn text(content: &str) -> ModelResponse {
            ModelResponse::new(content.to_string(), Some(10))
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        fn id(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-model"
        }

        async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
            self.requests.lock().await.push(request);
            self.replies
                .lock()
                .await
                .pop_front()
                .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted"))
        }
    }

    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<(String, Value)>>,
    }

    #[async_trait]
    impl ToolInvoker for RecordingInvoker {
        async fn invoke_tool(
            &self,
            tool: &str,
            arguments: Value,
        ) -> Result<Value, ToolInvokeError> {
            self.calls.lock().await.push((tool.to_string(), arguments));
            Ok(json!({ "content": [{ "type": "text", "text": "72F" }] }))
        }
    }

    fn weather_tools() -> HashMap<String, ToolCapability> {
        let mut tools = HashMap::new();
        tools.insert(
            "get-weather".to_string(),
            ToolCapability {
                name: "get-weather".to_string(),
                description: Some("Fetch weather data".to_string()),
                input_schema: None,
            },
        );
        tools
    }

    #[tokio::test]
    async fn plain_reply_becomes_completion() {
        let backend = Box::new(ScriptedBackend::new(vec![ScriptedBackend::text(
            "sunny and warm",
        )]));
        let agent = Agent::with_tools(backend, weather_tools(), Arc::new(RecordingInvoker::default()));

        let completion = agent.generate("weather?").await.expect("generation succeeds");
        assert_eq!(completion.text, "sunny and warm");
        assert_eq!(completion.used_tool_count, 0);
        assert_eq!(completion.token_usage, Some(10));
    }

    #[tokio::test]
    async fn tool_directive_invokes_and_feeds_result_back() {
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::text(r#"{"tool": "get-weather", "arguments": {"city": "Tokyo"}}"#),
            ScriptedBackend::text("72F in Tokyo"),
        ]);
        let invoker = Arc::new(RecordingInvoker::default());

        let completion = {
            let agent = Agent::with_tools(Box::new(backend), weather_tools(), invoker.clone());
            agent.generate("weather in Tokyo?").await.expect("succeeds")
        };

        assert_eq!(completion.text, "72F in Tokyo");
        assert_eq!(completion.used_tool_count, 1);
        assert_eq!(completion.token_usage, Some(20));

        let calls = invoker.calls.lock().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "get-weather");
        assert_eq!(calls[0].1, json!({ "city": "Tokyo" }));
    }

    #[tokio::test]
    async fn tool_result_lands_in_followup_messages() {
        let backend = ScriptedBackend::new(vec![
            ScriptedBackend::text(r#"{"tool": "get-weather"}"#),
            ScriptedBackend::text("done"),
        ]);
        let request_log = backend.request_log();

        let agent = Agent::with_tools(
            Box::new(backend),
            weather_tools(),
            Arc::new(RecordingInvoker::default()),
        );
        agent.generate("weather?").await.expect("succeeds");

        let requests = request_log.lock().await;
        assert_eq!(requests.len(), 2);
        let followup = &requests[1].messages;
        let last = followup.last().expect("tool result message");
        assert_eq!(last.role, MessageRole::User);
        assert!(last.content.contains("tool_result"));
        assert!(last.content.contains("\"success\":true"));
    }

    #[tokio::test]
    async fn unknown_tool_reports_failure_without_counting() {
        let backend = Box::new(ScriptedBackend::new(vec![
            ScriptedBackend::text(r#"{"tool": "get-stock"}"#),
            ScriptedBackend::text("sorry, no such tool"),
        ]));
        let agent = Agent::with_tools(backend, weather_tools(), Arc::new(RecordingInvoker::default()));

        let completion = agent.generate("stock price?").await.expect("succeeds");
        assert_eq!(completion.used_tool_count, 0);
        assert_eq!(completion.text, "sorry, no such tool");
    }

    #[tokio::test]
    async fn degraded_agent_has_no_tools_and_still_generates() {
        let backend = Box::new(ScriptedBackend::new(vec![ScriptedBackend::text(
            "the weather service is unavailable",
        )]));
        let agent = Agent::degraded(backend);

        assert!(agent.is_degraded());
        assert_eq!(agent.tool_count(), 0);
        let completion = agent.generate("weather?").await.expect("succeeds");
        assert_eq!(completion.text, "the weather service is unavailable");
    }

    #[tokio::test]
    async fn endless_directives_hit_the_step_limit() {
        let directive = r#"{"tool": "get-weather"}"#;
        let replies = (0..=MAX_TOOL_STEPS)
            .map(|_| ScriptedBackend::text(directive))
            .collect();
        let backend = Box::new(ScriptedBackend::new(replies));
        let agent = Agent::with_tools(backend, weather_tools(), Arc::new(RecordingInvoker::default()));

        let error = agent.generate("weather?").await.expect_err("must stop");
        assert!(matches!(error, GenerationError::StepLimit { .. }));
    }

    #[test]
    fn directive_parsing_tolerates_code_fences() {
        let fenced = "```json\n{\"tool\": \"get-weather\", \"arguments\": {}}\n```";
        assert_eq!(
            parse_directive(fenced),
            Directive::CallTool {
                tool: "get-weather".to_string(),
                arguments: json!({}),
            }
        );

        assert_eq!(
            parse_directive("  plain answer  "),
            Directive::Final("plain answer".to_string())
        );

        assert_eq!(
            parse_directive(r#"{"response": "wrapped answer"}"#),
            Directive::Final("wrapped answer".to_string())
        );
    }

    #[test]
    fn provider_content_shape_collapses_to_text() {
        let wrapped = json!({ "content": [
            { "type": "text", "text": "72F" },
            { "type": "text", "text": "clear skies" }
        ]});
        assert_eq!(
            flatten_tool_output(wrapped),
            Value::String("72F\nclear skies".to_string())
        );

        let passthrough = json!({ "rows": [1, 2, 3] });
        assert_eq!(flatten_tool_output(passthrough.clone()), passthrough);
    }

    #[test]
    fn tool_instruction_lists_capabilities() {
        let instruction = compose_tool_instruction(&weather_tools());
        assert!(instruction.contains("get-weather: Fetch weather data"));
        assert!(instruction.contains("prefer calling a tool"));
    }
}
