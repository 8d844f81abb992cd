//! Typed views over the browser's session and local storage.
//!
//! Both stores are plain string key/value maps. [`SessionState`] and
//! [`LocalState`] are the only code that knows the key names; everything else
//! goes through their `load`/`save` functions.

use std::collections::HashMap;

use crate::schema::{Schema, SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Stored schema is unreadable: {0}")]
    Schema(#[from] SchemaError),
    #[error("Stored value for '{key}' is unreadable: {source}")]
    Json {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A string key/value store with `sessionStorage` semantics.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

fn put(store: &mut dyn KeyValueStore, key: &str, value: Option<&str>) {
    match value {
        Some(v) => store.set(key, v),
        None => store.remove(key),
    }
}

fn flag(store: &dyn KeyValueStore, key: &str) -> bool {
    store.get(key).as_deref() == Some("true")
}

fn put_flag(store: &mut dyn KeyValueStore, key: &str, value: bool) {
    if value {
        store.set(key, "true");
    } else {
        store.remove(key);
    }
}

pub mod session_keys {
    pub const USER_PROMPT: &str = "userPrompt";
    pub const SCHEMA_DATA: &str = "schemaData";
    pub const DATA_READY: &str = "dataReady";
    pub const API_ENDPOINTS: &str = "apiEndpoints";
    pub const TABLE_DEFINITIONS: &str = "tableDefinitions";
    pub const PENDING_PROMPT: &str = "pendingPrompt";
    pub const RELOAD_SCHEMA: &str = "reload_schema";
}

pub mod local_keys {
    pub const SELECTED_API_ID: &str = "selectedApiId";
    pub const ENDPOINT_ORIGIN: &str = "endpoint_origin";
    pub const REFRESH_DASHBOARD: &str = "refresh_dashboard";
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USERNAME: &str = "username";
}

/// Tab-scoped state shared by the landing and schema pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user_prompt: Option<String>,
    pub schema: Option<Schema>,
    pub data_ready: bool,
    pub api_endpoints: Option<serde_json::Value>,
    pub table_definitions: Option<serde_json::Value>,
    pub pending_prompt: Option<String>,
    pub reload_schema: bool,
}

impl SessionState {
    pub fn load(store: &dyn KeyValueStore) -> Result<Self, StorageError> {
        use session_keys::*;

        let schema = store
            .get(SCHEMA_DATA)
            .map(|raw| Schema::from_json(&raw))
            .transpose()?;

        Ok(Self {
            user_prompt: store.get(USER_PROMPT),
            schema,
            data_ready: flag(store, DATA_READY),
            api_endpoints: load_json(store, API_ENDPOINTS)?,
            table_definitions: load_json(store, TABLE_DEFINITIONS)?,
            pending_prompt: store.get(PENDING_PROMPT),
            reload_schema: flag(store, RELOAD_SCHEMA),
        })
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        use session_keys::*;

        put(store, USER_PROMPT, self.user_prompt.as_deref());
        let schema = self.schema.as_ref().map(Schema::to_json);
        put(store, SCHEMA_DATA, schema.as_deref());
        put_flag(store, DATA_READY, self.data_ready);
        let endpoints = self.api_endpoints.as_ref().map(|v| v.to_string());
        put(store, API_ENDPOINTS, endpoints.as_deref());
        let definitions = self.table_definitions.as_ref().map(|v| v.to_string());
        put(store, TABLE_DEFINITIONS, definitions.as_deref());
        put(store, PENDING_PROMPT, self.pending_prompt.as_deref());
        put_flag(store, RELOAD_SCHEMA, self.reload_schema);
    }

    /// Write the schema after a local edit. Only touches the schema keys.
    pub fn save_schema(store: &mut dyn KeyValueStore, schema: &Schema) {
        store.set(session_keys::SCHEMA_DATA, &schema.to_json());
        store.set(session_keys::DATA_READY, "true");
        tracing::debug!(tables = schema.tables.len(), "schema written to session storage");
    }

    /// Consume the stale-state flag. When it was set, the stored schema is
    /// discarded so the page rebuilds it from scratch.
    pub fn take_reload_flag(store: &mut dyn KeyValueStore) -> bool {
        if !flag(store, session_keys::RELOAD_SCHEMA) {
            return false;
        }
        store.remove(session_keys::RELOAD_SCHEMA);
        store.remove(session_keys::SCHEMA_DATA);
        store.remove(session_keys::DATA_READY);
        tracing::debug!("reload flag consumed, stored schema discarded");
        true
    }
}

fn load_json(
    store: &dyn KeyValueStore,
    key: &'static str,
) -> Result<Option<serde_json::Value>, StorageError> {
    store
        .get(key)
        .map(|raw| serde_json::from_str(&raw).map_err(|source| StorageError::Json { key, source }))
        .transpose()
}

/// Origin-scoped state that outlives the tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    pub selected_api_id: Option<String>,
    pub endpoint_origin: Option<String>,
    pub refresh_dashboard: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
}

impl LocalState {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        use local_keys::*;

        Self {
            selected_api_id: store.get(SELECTED_API_ID),
            endpoint_origin: store.get(ENDPOINT_ORIGIN),
            refresh_dashboard: flag(store, REFRESH_DASHBOARD),
            access_token: store.get(ACCESS_TOKEN),
            refresh_token: store.get(REFRESH_TOKEN),
            username: store.get(USERNAME),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        use local_keys::*;

        put(store, SELECTED_API_ID, self.selected_api_id.as_deref());
        put(store, ENDPOINT_ORIGIN, self.endpoint_origin.as_deref());
        put_flag(store, REFRESH_DASHBOARD, self.refresh_dashboard);
        put(store, ACCESS_TOKEN, self.access_token.as_deref());
        put(store, REFRESH_TOKEN, self.refresh_token.as_deref());
        put(store, USERNAME, self.username.as_deref());
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;

#[cfg(target_arch = "wasm32")]
mod browser {
    use js_sys::{Array, Function, Reflect};
    use wasm_bindgen::{JsCast, JsValue};

    use super::KeyValueStore;

    /// `window.sessionStorage` / `window.localStorage`, reached through the
    /// global object.
    pub struct BrowserStorage {
        inner: JsValue,
    }

    impl BrowserStorage {
        pub fn session() -> Option<Self> {
            Self::named("sessionStorage")
        }

        pub fn local() -> Option<Self> {
            Self::named("localStorage")
        }

        fn named(name: &str) -> Option<Self> {
            let inner = Reflect::get(&js_sys::global(), &JsValue::from_str(name)).ok()?;
            if inner.is_undefined() || inner.is_null() {
                return None;
            }
            Some(Self { inner })
        }

        fn call(&self, method: &str, args: &Array) -> Option<JsValue> {
            let function: Function = Reflect::get(&self.inner, &JsValue::from_str(method))
                .ok()?
                .dyn_into()
                .ok()?;
            function.apply(&self.inner, args).ok()
        }
    }

    impl KeyValueStore for BrowserStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.call("getItem", &Array::of1(&JsValue::from_str(key)))
                .and_then(|v| v.as_string())
        }

        fn set(&mut self, key: &str, value: &str) {
            // Quota errors are dropped; the in-memory schema stays authoritative.
            let _ = self.call(
                "setItem",
                &Array::of2(&JsValue::from_str(key), &JsValue::from_str(value)),
            );
        }

        fn remove(&mut self, key: &str) {
            let _ = self.call("removeItem", &Array::of1(&JsValue::from_str(key)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};

    fn schema() -> Schema {
        Schema {
            tables: vec![Table {
                id: "users".to_string(),
                name: "users".to_string(),
                columns: vec![Column::new("id", "UUID").primary()],
            }],
            relationships: vec![],
        }
    }

    #[test]
    fn test_session_round_trip_uses_known_keys() {
        let mut store = MemoryStore::new();
        let state = SessionState {
            user_prompt: Some("a blog".to_string()),
            schema: Some(schema()),
            data_ready: true,
            api_endpoints: Some(serde_json::json!([{"path": "/users"}])),
            table_definitions: None,
            pending_prompt: None,
            reload_schema: false,
        };
        state.save(&mut store);

        assert_eq!(store.get("userPrompt").as_deref(), Some("a blog"));
        assert_eq!(store.get("dataReady").as_deref(), Some("true"));
        assert!(store.get("schemaData").unwrap().contains("\"users\""));
        assert!(store.get("reload_schema").is_none());
        assert_eq!(SessionState::load(&store).unwrap(), state);
    }

    #[test]
    fn test_save_clears_absent_values() {
        let mut store = MemoryStore::new();
        store.set("pendingPrompt", "old");
        store.set("dataReady", "true");
        SessionState::default().save(&mut store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_schema_marks_ready() {
        let mut store = MemoryStore::new();
        SessionState::save_schema(&mut store, &schema());
        let state = SessionState::load(&store).unwrap();
        assert!(state.data_ready);
        assert_eq!(state.schema, Some(schema()));
    }

    #[test]
    fn test_corrupt_schema_is_an_error() {
        let mut store = MemoryStore::new();
        store.set("schemaData", "{oops");
        assert!(matches!(SessionState::load(&store), Err(StorageError::Schema(_))));

        let mut store = MemoryStore::new();
        store.set("apiEndpoints", "[");
        assert!(matches!(
            SessionState::load(&store),
            Err(StorageError::Json { key: "apiEndpoints", .. })
        ));
    }

    #[test]
    fn test_reload_flag_discards_schema() {
        let mut store = MemoryStore::new();
        SessionState::save_schema(&mut store, &schema());
        assert!(!SessionState::take_reload_flag(&mut store));
        assert!(store.get("schemaData").is_some());

        store.set("reload_schema", "true");
        assert!(SessionState::take_reload_flag(&mut store));
        assert!(store.get("schemaData").is_none());
        assert!(store.get("dataReady").is_none());
        assert!(store.get("reload_schema").is_none());
    }

    #[test]
    fn test_local_state_round_trip() {
        let mut store = MemoryStore::new();
        let state = LocalState {
            selected_api_id: Some("api_42".to_string()),
            refresh_dashboard: true,
            access_token: Some("token".to_string()),
            username: Some("ada".to_string()),
            ..LocalState::default()
        };
        state.save(&mut store);
        assert_eq!(store.get("selectedApiId").as_deref(), Some("api_42"));
        assert_eq!(store.get("refresh_dashboard").as_deref(), Some("true"));
        assert_eq!(LocalState::load(&store), state);
    }
}
