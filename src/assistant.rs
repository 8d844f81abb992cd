//! Chat-style schema modification.

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, Transport};
use crate::context::AppContext;
use crate::editor::{EditOutcome, EditorAction, SchemaEditor};
use crate::workflow::{self, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Default)]
pub struct ChatAssistant {
    history: Vec<ChatMessage>,
}

impl ChatAssistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    fn push(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ChatMessage {
            role,
            content: content.into(),
        });
    }

    /// Ask the server to apply `prompt` to the editor's schema. The reply
    /// replaces the schema wholesale and is persisted like any local edit.
    pub async fn send<T: Transport>(
        &mut self,
        ctx: &mut AppContext,
        client: &ApiClient<T>,
        editor: &mut SchemaEditor,
        prompt: &str,
    ) -> Result<EditOutcome, WorkflowError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(WorkflowError::EmptyPrompt);
        }
        self.push(Role::User, prompt);

        let reply = workflow::with_timeout(
            "Schema modification",
            ctx.config.generation_timeout(),
            client.modify_schema(prompt, editor.schema()),
        )
        .await;

        let outcome = reply.and_then(|schema| {
            editor
                .dispatch(EditorAction::ReplaceSchema { schema })
                .map_err(WorkflowError::from)
        });

        match outcome {
            Ok(outcome) => {
                workflow::persist_outcome(ctx, &outcome);
                let summary = match &outcome {
                    EditOutcome::Changed(schema) => format!(
                        "Updated the schema: {} tables, {} relationships.",
                        schema.tables.len(),
                        schema.relationships.len()
                    ),
                    EditOutcome::Unchanged => "The schema already matches that request.".to_string(),
                };
                self.push(Role::Assistant, summary);
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(error = %err, "schema modification failed");
                self.push(Role::Error, err.to_string());
                Err(err)
            }
        }
    }
}
