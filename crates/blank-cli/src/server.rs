use blank_core::{DraftKind, DraftStatus, Error, InboundMessage};
use blank_store::JournalQuery;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::{DraftRequest, Pipeline};

#[derive(Clone)]
pub struct BlankServer {
    pipeline: Pipeline,
    tool_router: ToolRouter<Self>,
}

impl BlankServer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            tool_router: Self::tool_router(),
        }
    }

    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }
}

/// Caller mistakes become `invalid_params`; collaborator and store failures
/// become `internal_error`. Both carry the stable error code.
fn tool_error(e: Error) -> McpError {
    let data = Some(serde_json::json!({ "code": e.code() }));
    match e {
        Error::GenerationFailed(_) | Error::OracleUnavailable(_) | Error::StoreUnavailable(_) => {
            McpError::internal_error(e.to_string(), data)
        }
        _ => McpError::invalid_params(e.to_string(), data),
    }
}

fn parse_id(id: &str) -> Result<Uuid, McpError> {
    Uuid::parse_str(id.trim())
        .map_err(|_| tool_error(Error::InvalidInput(format!("'{id}' is not a valid id"))))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )]))
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct SubmitRequest {
    /// Wallet address of the author (32-64 alphanumeric characters)
    author_id: String,
    /// Entry text
    text: String,
    /// Ask for the entry to become a permanent core memory (tier III only)
    #[serde(default)]
    core_memory: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PendingRequest {
    /// Id of the last entry of the previous page
    cursor: Option<String>,
    /// Page size (default 20, at most 100)
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct IdRequest {
    /// Entry or draft id
    id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AnnotateRequest {
    /// Id of an approved entry
    id: String,
    /// Annotation text. Omit to generate one in character.
    text: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CycleRequest {
    /// Cycle number; defaults to the current cycle
    cycle: Option<u32>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ContextRequest {
    /// Cycle number; defaults to the current cycle
    cycle: Option<u32>,
    /// Return the rendered system prompt instead of the structured context
    #[serde(default)]
    prompt: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct JournalRequest {
    cycle: Option<u32>,
    /// Only permanent core memories
    #[serde(default)]
    core_only: bool,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChatTurn {
    /// "user" or "assistant"; anything else is treated as "user"
    role: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ChatRequest {
    /// Conversation so far, oldest first (at most 60 messages)
    messages: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct GenerateDraftsRequest {
    /// morning, midday_decision, evening_result or final_thought
    kind: String,
    /// Number of variants, 1-5 (default 3)
    count: Option<usize>,
    /// The day's decision, for midday_decision
    decision: Option<String>,
    /// How the decision played out, for evening_result
    result: Option<String>,
    /// Replaces the summary of today's journal
    context: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListDraftsRequest {
    /// draft, approved, posted or deleted (default draft)
    status: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct EditDraftRequest {
    id: String,
    /// Replacement text
    text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PostWakingRequest {
    first_post: String,
    second_post: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ListWakingRequest {
    /// Default 10, at most 100
    limit: Option<usize>,
}

#[tool_router]
impl BlankServer {
    #[tool(
        description = "Submit a journal entry on behalf of a holder. Their token balance is measured, which decides the tier: tier 0 cannot write, tiers limit length, tier I is limited to one entry per cycle, and only tier III may write core memories. The entry waits in the moderation queue."
    )]
    async fn blank_submit(
        &self,
        Parameters(req): Parameters<SubmitRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .pipeline
            .submit_entry(&req.author_id, &req.text, req.core_memory)
            .await
            .map_err(tool_error)?;
        json_result(&entry)
    }

    #[tool(description = "List entries waiting for moderation, newest first. Pass next_cursor back as cursor to page.")]
    async fn blank_pending(
        &self,
        Parameters(req): Parameters<PendingRequest>,
    ) -> Result<CallToolResult, McpError> {
        let cursor = req.cursor.as_deref().map(parse_id).transpose()?;
        let page = self
            .pipeline
            .list_pending(cursor, req.limit)
            .await
            .map_err(tool_error)?;
        json_result(&page)
    }

    #[tool(description = "Approve a pending entry so it becomes part of the cycle's memory.")]
    async fn blank_approve(
        &self,
        Parameters(req): Parameters<IdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .pipeline
            .approve(parse_id(&req.id)?)
            .await
            .map_err(tool_error)?;
        json_result(&entry)
    }

    #[tool(description = "Reject a pending entry. Rejection is final.")]
    async fn blank_reject(
        &self,
        Parameters(req): Parameters<IdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .pipeline
            .reject(parse_id(&req.id)?)
            .await
            .map_err(tool_error)?;
        json_result(&entry)
    }

    #[tool(description = "Attach a reply to an approved entry. Without text, one is generated in character. Replaces any earlier annotation.")]
    async fn blank_annotate(
        &self,
        Parameters(req): Parameters<AnnotateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .pipeline
            .annotate(parse_id(&req.id)?, req.text.as_deref())
            .await
            .map_err(tool_error)?;
        json_result(&entry)
    }

    #[tool(description = "Form the mind for a cycle: compress its approved entries, together with all core memories, into one synthesis. Running it again replaces the earlier synthesis.")]
    async fn blank_synthesize(
        &self,
        Parameters(req): Parameters<CycleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let synthesis = self
            .pipeline
            .run_synthesis(req.cycle)
            .await
            .map_err(tool_error)?;
        json_result(&synthesis)
    }

    #[tool(description = "Read the stored synthesis of a cycle (null if none).")]
    async fn blank_synthesis(
        &self,
        Parameters(req): Parameters<CycleRequest>,
    ) -> Result<CallToolResult, McpError> {
        let synthesis = self
            .pipeline
            .get_synthesis(req.cycle)
            .await
            .map_err(tool_error)?;
        json_result(&synthesis)
    }

    #[tool(description = "Assemble the context for a cycle: core memories, the synthesis and the approved entries, with an explicit empty status when nothing was written.")]
    async fn blank_context(
        &self,
        Parameters(req): Parameters<ContextRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.prompt {
            let prompt = self
                .pipeline
                .render_context_prompt(req.cycle)
                .await
                .map_err(tool_error)?;
            return json_result(&serde_json::json!({ "prompt": prompt }));
        }
        let context = self
            .pipeline
            .get_context(req.cycle)
            .await
            .map_err(tool_error)?;
        json_result(&context)
    }

    #[tool(description = "List approved journal entries, newest first, optionally for one cycle or only core memories.")]
    async fn blank_journal(
        &self,
        Parameters(req): Parameters<JournalRequest>,
    ) -> Result<CallToolResult, McpError> {
        let defaults = JournalQuery::default();
        let entries = self
            .pipeline
            .list_journal(JournalQuery {
                cycle_number: req.cycle,
                core_only: req.core_only,
                limit: req.limit.unwrap_or(defaults.limit),
                offset: req.offset.unwrap_or(defaults.offset),
            })
            .await
            .map_err(tool_error)?;
        json_result(&entries)
    }

    #[tool(description = "Show the current cycle number and when it started and ends.")]
    async fn blank_cycle(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.pipeline.cycle_info())
    }

    #[tool(description = "Talk to the agent. Its system prompt is the current cycle's context.")]
    async fn blank_chat(
        &self,
        Parameters(req): Parameters<ChatRequest>,
    ) -> Result<CallToolResult, McpError> {
        let messages = req
            .messages
            .into_iter()
            .map(|t| InboundMessage {
                role: t.role,
                content: t.content.map(serde_json::Value::String),
            })
            .collect();
        let reply = self.pipeline.chat(messages).await.map_err(tool_error)?;
        json_result(&serde_json::json!({ "reply": reply }))
    }

    #[tool(description = "Generate post drafts of one kind from today's journal. All variants are stored as drafts or, if any generation fails, none are.")]
    async fn blank_drafts_generate(
        &self,
        Parameters(req): Parameters<GenerateDraftsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let kind: DraftKind = req.kind.parse().map_err(tool_error)?;
        let drafts = self
            .pipeline
            .generate_drafts(DraftRequest {
                decision: req.decision,
                result: req.result,
                context: req.context,
                ..DraftRequest::new(kind, req.count.unwrap_or(3))
            })
            .await
            .map_err(tool_error)?;
        json_result(&drafts)
    }

    #[tool(description = "List drafts by status, newest first.")]
    async fn blank_drafts_list(
        &self,
        Parameters(req): Parameters<ListDraftsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let status: DraftStatus = match req.status.as_deref() {
            Some(s) => s.parse().map_err(tool_error)?,
            None => DraftStatus::Draft,
        };
        let drafts = self
            .pipeline
            .list_drafts(status)
            .await
            .map_err(tool_error)?;
        json_result(&drafts)
    }

    #[tool(description = "Approve a draft for posting.")]
    async fn blank_draft_approve(
        &self,
        Parameters(req): Parameters<IdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = self
            .pipeline
            .approve_draft(parse_id(&req.id)?)
            .await
            .map_err(tool_error)?;
        json_result(&draft)
    }

    #[tool(description = "Rewrite the text of a draft that has not been posted.")]
    async fn blank_draft_edit(
        &self,
        Parameters(req): Parameters<EditDraftRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = self
            .pipeline
            .edit_draft(parse_id(&req.id)?, &req.text)
            .await
            .map_err(tool_error)?;
        json_result(&draft)
    }

    #[tool(description = "Post an approved draft.")]
    async fn blank_draft_post(
        &self,
        Parameters(req): Parameters<IdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let posted = self
            .pipeline
            .post_draft(parse_id(&req.id)?)
            .await
            .map_err(tool_error)?;
        json_result(&posted)
    }

    #[tool(description = "Discard a draft that has not been posted.")]
    async fn blank_draft_delete(
        &self,
        Parameters(req): Parameters<IdRequest>,
    ) -> Result<CallToolResult, McpError> {
        let draft = self
            .pipeline
            .delete_draft(parse_id(&req.id)?)
            .await
            .map_err(tool_error)?;
        json_result(&draft)
    }

    #[tool(description = "Draft the two posts announcing the agent has woken into a new cycle. Nothing is stored until blank_waking_post.")]
    async fn blank_waking_draft(&self) -> Result<CallToolResult, McpError> {
        let draft = self.pipeline.waking_draft().await.map_err(tool_error)?;
        json_result(&draft)
    }

    #[tool(description = "Post and record the waking announcement for the current cycle.")]
    async fn blank_waking_post(
        &self,
        Parameters(req): Parameters<PostWakingRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entry = self
            .pipeline
            .post_waking(&req.first_post, req.second_post.as_deref())
            .await
            .map_err(tool_error)?;
        json_result(&entry)
    }

    #[tool(description = "List posted waking announcements, newest first.")]
    async fn blank_waking_list(
        &self,
        Parameters(req): Parameters<ListWakingRequest>,
    ) -> Result<CallToolResult, McpError> {
        let entries = self
            .pipeline
            .list_waking(req.limit.unwrap_or(10))
            .await
            .map_err(tool_error)?;
        json_result(&entries)
    }
}

#[tool_handler]
impl ServerHandler for BlankServer {
    fn get_info(&self) -> ServerInfo {
        let name = self.pipeline.persona().name();
        ServerInfo {
            instructions: Some(format!(
                "Operator console for {name}, an agent whose mind is rebuilt every cycle from a \
                 journal written by token holders.\n\n\
                 DAILY LOOP:\n\
                 1. MODERATE: blank_pending lists entries waiting for review. Approve or reject each \
                    with blank_approve / blank_reject; both are final.\n\
                 2. ANNOTATE: optionally reply to approved entries with blank_annotate.\n\
                 3. FORM: blank_synthesize compresses the cycle's approved entries into {name}'s mind. \
                    Re-run it after approving more entries.\n\
                 4. PUBLISH: blank_drafts_generate, then review with blank_draft_approve, \
                    blank_draft_edit, blank_draft_post or blank_draft_delete. At the start of a cycle, \
                    blank_waking_draft and blank_waking_post announce the reset.\n\n\
                 NOTES:\n\
                 - blank_context shows what {name} knows right now; status \"empty\" means nobody wrote.\n\
                 - Core memories are permanent and appear in every cycle.\n\
                 - Errors carry a code (for example rate_limit_exceeded) in their data."
            )),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
