//! Visual graph projection of a [`Schema`].
//!
//! The graph is what the browser's node/edge library renders. It is always
//! derived from a schema ([`hydrate`]) and read back with [`to_schema`]; it is
//! never the authoritative copy.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::layout::{CircleLayout, Position};
use crate::measure::TextMetrics;
use crate::schema::{Column, Relationship, RelationshipKind, Schema, Table};
use crate::style::{self, EdgeMarker, EdgeStyle};

const NODE_TYPE: &str = "table";
const EDGE_TYPE: &str = "smoothstep";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type", default = "default_node_type")]
    pub node_type: String,
    pub position: Position,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    #[serde(default)]
    pub fields: Vec<NodeField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeField {
    #[serde(flatten)]
    pub column: Column,
    /// Injected for display only; never written back to the schema
    #[serde(default, skip_serializing_if = "is_false")]
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: String,
    pub target_handle: String,
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
    #[serde(default)]
    pub animated: bool,
    pub style: EdgeStyle,
    pub marker_end: EdgeMarker,
    pub data: EdgeData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default)]
    pub relationship: RelationshipKind,
    pub source_field: String,
    pub target_field: String,
}

/// Options for projecting a schema into a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    pub layout: CircleLayout,
    /// Name of the read-only ownership column shown on every table
    pub owner_column: Option<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            layout: CircleLayout::default(),
            owner_column: Some("owner_id".to_string()),
        }
    }
}

fn default_node_type() -> String {
    NODE_TYPE.to_string()
}

fn default_edge_type() -> String {
    EDGE_TYPE.to_string()
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl VisualGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Project a schema onto the circular layout.
pub fn hydrate(schema: &Schema, options: &GraphOptions) -> VisualGraph {
    hydrate_with_positions(schema, options, &HashMap::new())
}

/// Like [`hydrate`], but nodes already present in `previous` keep their
/// positions. Used after edits so moved tables stay where the user left them.
pub fn rehydrate(schema: &Schema, options: &GraphOptions, previous: &VisualGraph) -> VisualGraph {
    let positions: HashMap<&str, Position> = previous
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), n.position))
        .collect();
    hydrate_with_positions(schema, options, &positions)
}

fn hydrate_with_positions(
    schema: &Schema,
    options: &GraphOptions,
    positions: &HashMap<&str, Position>,
) -> VisualGraph {
    let metrics = TextMetrics::default();
    let count = schema.tables.len();

    let nodes: Vec<GraphNode> = schema
        .tables
        .iter()
        .enumerate()
        .map(|(index, table)| {
            let fields = node_fields(table, options.owner_column.as_deref());
            let columns: Vec<Column> = fields.iter().map(|f| f.column.clone()).collect();
            let (width, height) = metrics.node_size(&table.name, &columns);
            let position = positions
                .get(table.id.as_str())
                .copied()
                .unwrap_or_else(|| options.layout.position(index, count));

            GraphNode {
                id: table.id.clone(),
                node_type: default_node_type(),
                position,
                width,
                height,
                data: NodeData {
                    label: table.name.clone(),
                    fields,
                },
            }
        })
        .collect();

    let edges = schema.relationships.iter().map(edge_for).collect();

    VisualGraph { nodes, edges }
}

fn node_fields(table: &Table, owner_column: Option<&str>) -> Vec<NodeField> {
    let mut fields: Vec<NodeField> = table
        .columns
        .iter()
        .map(|c| NodeField {
            column: c.clone(),
            internal: false,
        })
        .collect();

    if let Some(owner) = owner_column {
        if table.column(owner).is_none() {
            fields.push(NodeField {
                column: Column::new(owner, "UUID"),
                internal: true,
            });
        }
    }

    fields
}

fn edge_for(rel: &Relationship) -> GraphEdge {
    GraphEdge {
        id: rel.edge_id(),
        source: rel.source_table.clone(),
        target: rel.target_table.clone(),
        source_handle: format!("{}.{}", rel.source_table, rel.source_column),
        target_handle: format!("{}.{}", rel.target_table, rel.target_column),
        edge_type: default_edge_type(),
        animated: style::is_animated(rel.kind),
        style: EdgeStyle::for_kind(rel.kind),
        marker_end: EdgeMarker::for_kind(rel.kind),
        data: EdgeData {
            relationship: rel.kind,
            source_field: rel.source_column.clone(),
            target_field: rel.target_column.clone(),
        },
    }
}

/// Read a schema back out of a graph. Internal fields are dropped, as are
/// edges whose endpoints are no longer in the graph.
pub fn to_schema(graph: &VisualGraph) -> Schema {
    let tables: Vec<Table> = graph
        .nodes
        .iter()
        .map(|node| Table {
            id: node.id.clone(),
            name: node.data.label.clone(),
            columns: node
                .data
                .fields
                .iter()
                .filter(|f| !f.internal)
                .map(|f| f.column.clone())
                .collect(),
        })
        .collect();

    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    let relationships = graph
        .edges
        .iter()
        .filter(|e| node_ids.contains(e.source.as_str()) && node_ids.contains(e.target.as_str()))
        .map(|e| Relationship {
            source_table: e.source.clone(),
            target_table: e.target.clone(),
            source_column: e.data.source_field.clone(),
            target_column: e.data.target_field.clone(),
            kind: e.data.relationship,
        })
        .collect();

    Schema {
        tables,
        relationships,
    }
}

/// Memo over the last committed serialization. A graph change only yields a
/// new schema when its serialized form differs from what was last committed.
#[derive(Debug, Default)]
pub struct GraphSync {
    last_committed: Option<String>,
}

impl GraphSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a schema that is already persisted (e.g. the one just hydrated).
    pub fn prime(&mut self, schema: &Schema) {
        self.last_committed = Some(schema.to_json());
    }

    pub fn commit(&mut self, graph: &VisualGraph) -> Option<Schema> {
        let schema = to_schema(graph);
        self.commit_schema(schema)
    }

    pub fn commit_schema(&mut self, schema: Schema) -> Option<Schema> {
        let serialized = schema.to_json();
        if self.last_committed.as_deref() == Some(serialized.as_str()) {
            return None;
        }
        self.last_committed = Some(serialized);
        Some(schema)
    }
}
