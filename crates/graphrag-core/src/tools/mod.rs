//! Tool-calling orchestrator: a bounded ReAct-style state machine over
//! `{ generate, parse, call_tool, observe, final }`, used for term-definition
//! queries that need the glossary subsystem.

pub mod glossary;

use serde::Serialize;

use crate::llm::{GenerateOptions, LlmClient};
use crate::tools::glossary::GlossarySubsystem;

/// Iteration cap: on reaching it, the agent must emit its best partial
/// answer rather than loop forever.
pub const MAX_ITERATIONS: u32 = 3;

/// Result of running the agent loop to completion (or truncation).
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub answer: String,
    pub tool_invoked: bool,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// A parsed model turn: either a final answer or a request to call a tool.
enum ParsedTurn {
    Final(String),
    ToolCall { name: String, arg: String },
    Unparseable,
}

/// Drives the `generate -> parse -> call_tool -> observe` loop for a single
/// query, bounded at [`MAX_ITERATIONS`]. Only one tool is registered today
/// (`define_term`); unknown tool names are refused rather than silently
/// ignored.
pub struct ToolCallingAgent {
    llm: std::sync::Arc<LlmClient>,
    glossary: std::sync::Arc<GlossarySubsystem>,
}

impl ToolCallingAgent {
    pub fn new(llm: std::sync::Arc<LlmClient>, glossary: std::sync::Arc<GlossarySubsystem>) -> Self {
        Self { llm, glossary }
    }

    pub async fn run(&self, query: &str) -> AgentResult {
        let mut transcript = build_initial_prompt(query);
        let mut tool_invoked = false;

        for iteration in 1..=MAX_ITERATIONS {
            let raw = match self.llm.generate(&transcript, &GenerateOptions::default()).await {
                Ok(text) => text,
                Err(e) => {
                    return AgentResult {
                        answer: String::new(),
                        tool_invoked,
                        truncated: false,
                        failure: Some(e.to_string()),
                    };
                }
            };

            match parse_turn(&raw) {
                ParsedTurn::Final(answer) => {
                    return AgentResult { answer, tool_invoked, truncated: false, failure: None };
                }
                ParsedTurn::ToolCall { name, arg } => {
                    if name != "define_term" {
                        return AgentResult {
                            answer: String::new(),
                            tool_invoked,
                            truncated: false,
                            failure: Some(format!("unknown tool: {name}")),
                        };
                    }
                    tool_invoked = true;
                    let observation = match self.glossary.define(&arg).await {
                        Ok(def) => format!("Observation: {}", def.definition),
                        Err(e) => format!("Observation: error: {}", e.error),
                    };
                    transcript.push_str("\n");
                    transcript.push_str(&raw);
                    transcript.push_str("\n");
                    transcript.push_str(&observation);
                }
                ParsedTurn::Unparseable => {
                    return AgentResult {
                        answer: String::new(),
                        tool_invoked,
                        truncated: false,
                        failure: Some("failed to parse model output".to_string()),
                    };
                }
            }

            if iteration == MAX_ITERATIONS {
                return AgentResult {
                    answer: raw,
                    tool_invoked,
                    truncated: true,
                    failure: None,
                };
            }
        }

        unreachable!("loop always returns by MAX_ITERATIONS")
    }
}

fn build_initial_prompt(query: &str) -> String {
    format!(
        "You may call the tool define_term(term) to look up a glossary definition. \
         Respond either with `Tool: define_term(\"<term>\")` or `Final: <answer>`.\n\nQuery: {query}"
    )
}

fn parse_turn(raw: &str) -> ParsedTurn {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("Final:") {
        return ParsedTurn::Final(rest.trim().to_string());
    }
    if let Some(rest) = trimmed.strip_prefix("Tool:") {
        let rest = rest.trim();
        if let Some(open) = rest.find('(') {
            let name = rest[..open].trim().to_string();
            let args = rest[open + 1..].trim_end_matches(')').trim().trim_matches('"');
            return ParsedTurn::ToolCall { name, arg: args.to_string() };
        }
    }
    ParsedTurn::Unparseable
}
