pub mod api;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod editor;
pub mod graph;
pub mod layout;
pub mod measure;
pub mod pagination;
pub mod schema;
pub mod storage;
pub mod style;
pub mod svg;
pub mod validate;

#[cfg(not(target_arch = "wasm32"))]
pub mod assistant;
#[cfg(not(target_arch = "wasm32"))]
pub mod payment;
#[cfg(not(target_arch = "wasm32"))]
pub mod workflow;

use wasm_bindgen::prelude::*;

use editor::{EditOutcome, EditorAction, SchemaEditor};
use graph::{GraphOptions, VisualGraph};
use pagination::Pagination;
use schema::Schema;
use svg::SvgRenderer;
use validate::RelationshipPolicy;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Decode a schema document and lay it out as a node/edge graph
#[wasm_bindgen(js_name = "hydrateSchema")]
pub fn hydrate_schema(source: &str) -> Result<String, String> {
    let schema = Schema::from_json(source).map_err(|e| e.to_string())?;
    Ok(graph::hydrate(&schema, &GraphOptions::default()).to_json())
}

/// Read a schema back out of an edited graph
#[wasm_bindgen(js_name = "graphToSchema")]
pub fn graph_to_schema(source: &str) -> Result<String, String> {
    let graph = VisualGraph::from_json(source).map_err(|e| e.to_string())?;
    Ok(graph::to_schema(&graph).to_json())
}

/// Apply one editor action and return the resulting schema.
/// Rejected edits come back as the validation message.
#[wasm_bindgen(js_name = "applyEdit")]
pub fn apply_edit(schema_json: &str, action_json: &str) -> Result<String, String> {
    let schema = Schema::from_json(schema_json).map_err(|e| e.to_string())?;
    let action: EditorAction = serde_json::from_str(action_json).map_err(|e| e.to_string())?;

    let mut editor =
        SchemaEditor::new(schema, GraphOptions::default(), RelationshipPolicy::default());
    match editor.dispatch(action).map_err(|e| e.to_string())? {
        EditOutcome::Changed(schema) => Ok(schema.to_json()),
        EditOutcome::Unchanged => Ok(editor.schema().to_json()),
    }
}

#[wasm_bindgen(js_name = "renderSchemaSvg")]
pub fn render_schema_svg(source: &str) -> Result<String, String> {
    let schema = Schema::from_json(source).map_err(|e| e.to_string())?;
    let graph = graph::hydrate(&schema, &GraphOptions::default());
    Ok(SvgRenderer::default().render(&graph))
}

#[wasm_bindgen(js_name = "validateName")]
pub fn validate_name(name: &str) -> bool {
    validate::is_valid_name(name)
}

/// Clamp `page` and return `{page, totalPages, start, end}` as JSON
#[wasm_bindgen]
pub fn paginate(total: usize, size: usize, page: usize) -> String {
    let pagination = Pagination::new(total, size);
    let range = pagination.range(page);
    serde_json::json!({
        "page": pagination.clamp(page),
        "totalPages": pagination.total_pages(),
        "start": range.start,
        "end": range.end,
    })
    .to_string()
}
