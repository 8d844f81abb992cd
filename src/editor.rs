//! Reducer-style schema editing.
//!
//! Every user gesture is an [`EditorAction`]. Dispatching one computes a new
//! [`Schema`] from the current one, then re-derives the visual graph from it.
//! Data only flows schema -> graph, so there is no feedback path to guard.

use serde::{Deserialize, Serialize};

use crate::graph::{self, GraphOptions, GraphSync, VisualGraph};
use crate::layout::Position;
use crate::schema::{self, Column, Relationship, RelationshipKind, Schema, Table};
use crate::validate::{
    self, RelationshipDraft, RelationshipError, RelationshipPolicy, ValidationError,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Table(#[from] ValidationError),
    #[error(transparent)]
    Relationship(#[from] RelationshipError),
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),
    #[error("Relationship '{0}' does not exist")]
    UnknownRelationship(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EditorAction {
    AddTable {
        name: String,
        columns: Vec<Column>,
    },
    UpdateTable {
        id: String,
        name: String,
        columns: Vec<Column>,
    },
    DeleteTable {
        id: String,
    },
    AddRelationship(RelationshipDraft),
    UpdateRelationshipKind {
        edge_id: String,
        kind: RelationshipKind,
    },
    DeleteRelationship {
        edge_id: String,
    },
    MoveNode {
        id: String,
        position: Position,
    },
    /// The graph library reported a change made on its side
    SyncGraph {
        graph: VisualGraph,
    },
    ReplaceSchema {
        schema: Schema,
    },
}

impl EditorAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddTable { .. } => "add_table",
            Self::UpdateTable { .. } => "update_table",
            Self::DeleteTable { .. } => "delete_table",
            Self::AddRelationship(_) => "add_relationship",
            Self::UpdateRelationshipKind { .. } => "update_relationship_kind",
            Self::DeleteRelationship { .. } => "delete_relationship",
            Self::MoveNode { .. } => "move_node",
            Self::SyncGraph { .. } => "sync_graph",
            Self::ReplaceSchema { .. } => "replace_schema",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The serialized schema changed and should be persisted.
    Changed(Schema),
    Unchanged,
}

#[derive(Debug)]
pub struct SchemaEditor {
    schema: Schema,
    graph: VisualGraph,
    options: GraphOptions,
    policy: RelationshipPolicy,
    sync: GraphSync,
}

impl SchemaEditor {
    pub fn new(schema: Schema, options: GraphOptions, policy: RelationshipPolicy) -> Self {
        let graph = graph::hydrate(&schema, &options);
        let mut sync = GraphSync::new();
        sync.prime(&schema);
        Self {
            schema,
            graph,
            options,
            policy,
            sync,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn graph(&self) -> &VisualGraph {
        &self.graph
    }

    pub fn policy(&self) -> &RelationshipPolicy {
        &self.policy
    }

    pub fn dispatch(&mut self, action: EditorAction) -> Result<EditOutcome, EditError> {
        let name = action.name();
        let outcome = match action {
            EditorAction::MoveNode { id, position } => {
                let node = self
                    .graph
                    .node_mut(&id)
                    .ok_or_else(|| EditError::UnknownTable(id.clone()))?;
                node.position = position;
                EditOutcome::Unchanged
            }
            EditorAction::SyncGraph { graph } => {
                let next = graph::to_schema(&graph);
                self.graph = graph;
                self.apply(next)
            }
            other => {
                let next = self.reduce(other)?;
                self.apply(next)
            }
        };

        tracing::debug!(
            action = name,
            changed = matches!(outcome, EditOutcome::Changed(_)),
            tables = self.schema.tables.len(),
            relationships = self.schema.relationships.len(),
            "schema edit applied"
        );
        Ok(outcome)
    }

    fn apply(&mut self, next: Schema) -> EditOutcome {
        self.graph = graph::rehydrate(&next, &self.options, &self.graph);
        self.schema = next;
        match self.sync.commit_schema(self.schema.clone()) {
            Some(schema) => EditOutcome::Changed(schema),
            None => EditOutcome::Unchanged,
        }
    }

    /// Compute the schema that results from `action`. Never touches `self`.
    fn reduce(&self, action: EditorAction) -> Result<Schema, EditError> {
        let mut next = self.schema.clone();

        match action {
            EditorAction::AddTable { name, columns } => {
                validate::validate_table(&name, &columns)?;
                validate::validate_unique_table_name(&next, &name, None)?;
                let id = unique_table_id(&next, &name);
                next.tables.push(Table { id, name, columns });
            }
            EditorAction::UpdateTable { id, name, columns } => {
                validate::validate_table(&name, &columns)?;
                validate::validate_unique_table_name(&next, &name, Some(&id))?;
                let table = next
                    .table_mut(&id)
                    .ok_or_else(|| EditError::UnknownTable(id.clone()))?;
                table.name = name;
                table.columns = columns;

                // Key flags come from the form, so only the type-based
                // heuristics are re-checked against the edited columns.
                let recheck = RelationshipPolicy {
                    require_keys_for_one_to_many: false,
                    ..self.policy
                };
                let (kept, dropped): (Vec<Relationship>, Vec<Relationship>) =
                    std::mem::take(&mut next.relationships)
                        .into_iter()
                        .partition(|r| {
                            if r.source_table != id && r.target_table != id {
                                return true;
                            }
                            match (next.column(r.source()), next.column(r.target())) {
                                (Some(source), Some(target)) => {
                                    validate::check_pair(source, target, r.kind, &recheck).is_ok()
                                }
                                _ => false,
                            }
                        });
                next.relationships = kept;
                for rel in &dropped {
                    tracing::debug!(relationship = %rel.edge_id(), "relationship no longer valid after table edit");
                    detach(&mut next, rel, None);
                }
            }
            EditorAction::DeleteTable { id } => {
                let Some(target_name) = next.table(&id).map(|t| t.name.clone()) else {
                    return Err(EditError::UnknownTable(id));
                };
                next.tables.retain(|t| t.id != id);
                let (dropped, kept): (Vec<Relationship>, Vec<Relationship>) =
                    std::mem::take(&mut next.relationships)
                        .into_iter()
                        .partition(|r| r.source_table == id || r.target_table == id);
                next.relationships = kept;
                for rel in &dropped {
                    detach(&mut next, rel, Some(&target_name));
                }
            }
            EditorAction::AddRelationship(draft) => {
                validate::validate_relationship(&next, &draft, &self.policy)?;
                let rel = Relationship {
                    source_table: draft.source_table.unwrap_or_default(),
                    target_table: draft.target_table.unwrap_or_default(),
                    source_column: draft.source_column.unwrap_or_default(),
                    target_column: draft.target_column.unwrap_or_default(),
                    kind: draft.kind,
                };
                if rel.kind == RelationshipKind::OneToMany {
                    mark_foreign(&mut next, &rel);
                }
                next.relationships.push(rel);
            }
            EditorAction::UpdateRelationshipKind { edge_id, kind } => {
                let index = relationship_index(&next, &edge_id)?;
                if kind == RelationshipKind::OneToMany && self.policy.require_keys_for_one_to_many {
                    let rel = &next.relationships[index];
                    let keyed = [rel.source(), rel.target()]
                        .into_iter()
                        .filter_map(|f| next.column(f))
                        .any(|c| c.is_primary || c.is_foreign);
                    if !keyed {
                        return Err(RelationshipError::MissingKey.into());
                    }
                }
                next.relationships[index].kind = kind;
            }
            EditorAction::DeleteRelationship { edge_id } => {
                let index = relationship_index(&next, &edge_id)?;
                let rel = next.relationships.remove(index);
                detach(&mut next, &rel, None);
            }
            EditorAction::ReplaceSchema { schema } => {
                next = schema;
            }
            EditorAction::MoveNode { .. } | EditorAction::SyncGraph { .. } => {}
        }

        Ok(next)
    }
}

fn relationship_index(schema: &Schema, edge_id: &str) -> Result<usize, EditError> {
    schema
        .relationships
        .iter()
        .position(|r| r.edge_id() == edge_id)
        .ok_or_else(|| EditError::UnknownRelationship(edge_id.to_string()))
}

/// Undo what a relationship left on its source column: the matching
/// `references` constraint, and the foreign flag once nothing else backs it.
/// `target_name` is needed when the target table is already gone.
fn detach(next: &mut Schema, rel: &Relationship, target_name: Option<&str>) {
    let target_name = target_name
        .map(str::to_string)
        .or_else(|| next.table(&rel.target_table).map(|t| t.name.clone()))
        .unwrap_or_else(|| rel.target_table.clone());
    let still_related = next
        .relationships
        .iter()
        .any(|r| r.source_table == rel.source_table && r.source_column == rel.source_column);

    let Some(column) = next
        .table_mut(&rel.source_table)
        .and_then(|t| t.columns.iter_mut().find(|c| c.name == rel.source_column))
    else {
        return;
    };

    column.constraints.retain(|c| {
        !schema::references_target(c)
            .is_some_and(|(table, col)| {
                (table.eq_ignore_ascii_case(&target_name) || table == rel.target_table)
                    && col == rel.target_column
            })
    });
    let declared = column
        .constraints
        .iter()
        .any(|c| c.to_lowercase().contains("foreign key") || schema::references_target(c).is_some());
    if !still_related && !declared {
        column.is_foreign = false;
    }
}

/// The many side of a one-to-many becomes a foreign key unless it is
/// already a key.
fn mark_foreign(schema: &mut Schema, rel: &Relationship) {
    if let Some(column) = schema
        .table_mut(&rel.source_table)
        .and_then(|t| t.columns.iter_mut().find(|c| c.name == rel.source_column))
    {
        if !column.is_primary {
            column.is_foreign = true;
        }
    }
}

fn unique_table_id(schema: &Schema, name: &str) -> String {
    let base = name.to_lowercase();
    if schema.table(&base).is_none() {
        return base;
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| schema.table(candidate).is_none())
        .unwrap_or(base)
}
