//! Page-level flows: generate a schema from a prompt, restore the editor on
//! page load, and turn the finished schema into a live API.
//!
//! Each remote step is awaited directly under a wall-clock limit. Dropping
//! the returned future (e.g. when the user navigates away) cancels it.

use std::future::Future;
use std::time::Duration;

use crate::api::{ApiClient, ApiError, CreatedApi, Transport};
use crate::context::AppContext;
use crate::editor::{EditError, EditOutcome, SchemaEditor};
use crate::schema::Schema;
use crate::storage::{KeyValueStore, SessionState, StorageError, session_keys};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("{operation} timed out after {}s", .limit.as_secs())]
    TimedOut {
        operation: &'static str,
        limit: Duration,
    },
    #[error("Please describe the database you want to build")]
    EmptyPrompt,
}

pub(crate) async fn with_timeout<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, WorkflowError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => {
            tracing::warn!(operation, limit_secs = limit.as_secs(), "gave up waiting");
            Err(WorkflowError::TimedOut { operation, limit })
        }
    }
}

/// Landing-page submission: generate a schema and leave it in session
/// storage for the schema page.
pub async fn generate_schema<T: Transport>(
    ctx: &mut AppContext,
    client: &ApiClient<T>,
    prompt: &str,
) -> Result<Schema, WorkflowError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(WorkflowError::EmptyPrompt);
    }

    let session = ctx.session.as_mut();
    session.set(session_keys::USER_PROMPT, prompt);
    session.set(session_keys::PENDING_PROMPT, prompt);
    session.remove(session_keys::DATA_READY);

    let user_id = ctx.auth.user_id().map(str::to_string);
    let schema = with_timeout(
        "Schema generation",
        ctx.config.generation_timeout(),
        client.generate_schema(prompt, user_id.as_deref()),
    )
    .await?;

    SessionState::save_schema(ctx.session.as_mut(), &schema);
    ctx.session.remove(session_keys::PENDING_PROMPT);
    tracing::info!(tables = schema.tables.len(), "generated schema stored");
    Ok(schema)
}

/// What the schema page finds on mount.
pub enum Restored {
    Editor(SchemaEditor),
    /// No schema yet, but a prompt that still needs generating.
    Pending(String),
    Empty,
}

pub fn restore_editor(ctx: &mut AppContext) -> Result<Restored, WorkflowError> {
    if SessionState::take_reload_flag(ctx.session.as_mut()) {
        tracing::info!("stale schema discarded on request");
    }

    let state = ctx.session_state()?;
    if let (true, Some(schema)) = (state.data_ready, state.schema) {
        let editor = SchemaEditor::new(
            schema,
            ctx.config.graph.clone(),
            ctx.config.relationship_policy,
        );
        return Ok(Restored::Editor(editor));
    }

    match state.pending_prompt.or(state.user_prompt) {
        Some(prompt) => Ok(Restored::Pending(prompt)),
        None => Ok(Restored::Empty),
    }
}

/// Write an edit through to session storage when it changed the schema.
pub fn persist_outcome(ctx: &mut AppContext, outcome: &EditOutcome) {
    if let EditOutcome::Changed(schema) = outcome {
        SessionState::save_schema(ctx.session.as_mut(), schema);
    }
}

/// Schema page "create API": materialize the schema and hand the new API id
/// to the dashboard.
pub async fn finalize_schema<T: Transport>(
    ctx: &mut AppContext,
    client: &ApiClient<T>,
    schema: &Schema,
) -> Result<CreatedApi, WorkflowError> {
    let created = with_timeout(
        "API generation",
        ctx.config.endpoint_timeout(),
        client.create_api_from_schema(schema),
    )
    .await?;

    ctx.update_local(|local| {
        local.selected_api_id = created.api_id.clone();
        local.endpoint_origin = Some("schema".to_string());
        local.refresh_dashboard = true;
    });

    let mut session = ctx.session_state()?;
    session.api_endpoints = created.endpoints.clone();
    session.table_definitions = created.tables.clone();
    session.save(ctx.session.as_mut());

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockTransport;
    use crate::config::Config;
    use crate::context::{AuthState, User};
    use crate::editor::EditorAction;
    use crate::layout::Position;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    fn ctx() -> AppContext {
        let mut ctx = AppContext::in_memory(Config::default());
        ctx.auth = AuthState {
            user: Some(User {
                id: "u1".to_string(),
                username: "ada".to_string(),
            }),
            access_token: Some("jwt".to_string()),
        };
        ctx
    }

    fn users_reply() -> Value {
        json!({"tables":[{"name":"users","columns":[
            {"name":"id","type":"UUID","constraints":["primary key"]}
        ]}]})
    }

    #[tokio::test]
    async fn test_generate_stores_schema_and_ready_flag() {
        let mut ctx = ctx();
        let client = ApiClient::new(MockTransport::with_replies(vec![Ok(users_reply())]));

        let schema = generate_schema(&mut ctx, &client, "  a blog  ").await.unwrap();

        let state = ctx.session_state().unwrap();
        assert!(state.data_ready);
        assert_eq!(state.schema, Some(schema.clone()));
        // Stored normalized, with flags and ids filled in
        let raw = ctx.session.get(session_keys::SCHEMA_DATA).unwrap();
        assert_eq!(raw, schema.to_json());
        assert!(raw.contains(r#""id":"users""#) && raw.contains(r#""isPrimary":true"#));
        assert_eq!(state.user_prompt.as_deref(), Some("a blog"));
        assert_eq!(state.pending_prompt, None);
        assert_eq!(
            client.transport().requests()[0].body,
            Some(json!({"prompt": "a blog", "userId": "u1"}))
        );
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected() {
        let mut ctx = ctx();
        let client = ApiClient::new(MockTransport::default());
        let err = generate_schema(&mut ctx, &client, "   ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyPrompt));
        assert!(client.transport().requests().is_empty());
    }

    struct NeverReplies;

    #[async_trait]
    impl Transport for NeverReplies {
        async fn send(&self, _request: crate::api::ApiRequest) -> Result<Value, ApiError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_times_out() {
        let mut ctx = ctx();
        let client = ApiClient::new(NeverReplies);

        let err = generate_schema(&mut ctx, &client, "a shop").await.unwrap_err();
        assert_eq!(err.to_string(), "Schema generation timed out after 20s");

        // The prompt is kept so the page can offer a retry.
        match restore_editor(&mut ctx).unwrap() {
            Restored::Pending(prompt) => assert_eq!(prompt, "a shop"),
            _ => panic!("expected a pending prompt"),
        }
    }

    #[test]
    fn test_restore_honours_reload_flag() {
        let mut ctx = ctx();
        let schema = Schema::from_value(users_reply()).unwrap();
        SessionState::save_schema(ctx.session.as_mut(), &schema);

        match restore_editor(&mut ctx).unwrap() {
            Restored::Editor(editor) => assert_eq!(editor.schema(), &schema),
            _ => panic!("expected an editor"),
        }

        ctx.session.set(session_keys::RELOAD_SCHEMA, "true");
        assert!(matches!(restore_editor(&mut ctx).unwrap(), Restored::Empty));
    }

    #[test]
    fn test_edits_are_persisted() {
        let mut ctx = ctx();
        let schema = Schema::from_value(users_reply()).unwrap();
        SessionState::save_schema(ctx.session.as_mut(), &schema);
        let Restored::Editor(mut editor) = restore_editor(&mut ctx).unwrap() else {
            panic!("expected an editor");
        };

        let moved = editor
            .dispatch(EditorAction::MoveNode {
                id: "users".to_string(),
                position: Position::new(1.0, 2.0),
            })
            .unwrap();
        persist_outcome(&mut ctx, &moved);
        assert_eq!(ctx.session_state().unwrap().schema, Some(schema));

        let outcome = editor
            .dispatch(EditorAction::DeleteTable {
                id: "users".to_string(),
            })
            .unwrap();
        persist_outcome(&mut ctx, &outcome);
        assert!(ctx.session_state().unwrap().schema.unwrap().tables.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_hands_off_to_dashboard() {
        let mut ctx = ctx();
        let client = ApiClient::new(MockTransport::with_replies(vec![Ok(json!({
            "success": true,
            "apiId": "api_9",
            "tables": [{"name": "users"}],
            "endpoints": [{"method": "GET", "path": "/users"}]
        }))]));
        let schema = Schema::from_value(users_reply()).unwrap();

        let created = finalize_schema(&mut ctx, &client, &schema).await.unwrap();
        assert_eq!(created.api_id.as_deref(), Some("api_9"));

        let local = ctx.local_state();
        assert_eq!(local.selected_api_id.as_deref(), Some("api_9"));
        assert!(local.refresh_dashboard);

        let session = ctx.session_state().unwrap();
        assert_eq!(session.api_endpoints, Some(json!([{"method": "GET", "path": "/users"}])));
        assert_eq!(session.table_definitions, Some(json!([{"name": "users"}])));
    }
}
