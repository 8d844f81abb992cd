//! Schema data model and the JSON decode boundary.
//!
//! Remote payloads are loosely shaped: flags may be missing, relationships may
//! only exist as `references` constraints. All of that is defaulted here, once,
//! so the rest of the crate works on fully populated values.

use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemaDoc")]
pub struct Schema {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TableDoc")]
pub struct Table {
    pub id: String,
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColumnDoc", rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub is_primary: bool,
    pub is_foreign: bool,
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub source_table: String,
    pub target_table: String,
    pub source_column: String,
    pub target_column: String,
    #[serde(default, alias = "relationship", alias = "type")]
    pub kind: RelationshipKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    OneToOne,
    #[default]
    OneToMany,
    ManyToMany,
}

impl RelationshipKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "one-to-one" | "1:1" => Some(Self::OneToOne),
            "one-to-many" | "1:n" => Some(Self::OneToMany),
            "many-to-many" | "n:m" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        }
    }
}

/// A (table id, column name) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef<'a> {
    pub table: &'a str,
    pub column: &'a str,
}

impl<'a> FieldRef<'a> {
    pub fn new(table: &'a str, column: &'a str) -> Self {
        Self { table, column }
    }
}

impl Schema {
    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Canonical serialization. Field order is fixed by the types, so equal
    /// schemas always produce identical strings.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn table(&self, id: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn table_mut(&mut self, id: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.id == id)
    }

    pub fn column(&self, field: FieldRef<'_>) -> Option<&Column> {
        self.table(field.table).and_then(|t| t.column(field.column))
    }

    pub fn relationships_of<'s>(&'s self, table_id: &'s str) -> impl Iterator<Item = &'s Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.source_table == table_id || r.target_table == table_id)
    }

    /// Whether any relationship joins the two fields, in either direction.
    pub fn has_relationship_between(&self, a: FieldRef<'_>, b: FieldRef<'_>) -> bool {
        self.relationships.iter().any(|r| r.connects(a, b))
    }

    /// Tables as the remote API expects them: relationships are folded into
    /// `references table(column)` constraints on the source column. Any
    /// `references` constraint already on a column is dropped first, so the
    /// export always describes exactly `self.relationships`.
    pub fn tables_with_references(&self) -> Vec<Table> {
        let mut tables = self.tables.clone();
        for column in tables.iter_mut().flat_map(|t| t.columns.iter_mut()) {
            column.constraints.retain(|c| !REFERENCES.is_match(c));
        }

        for rel in &self.relationships {
            let Some(target) = self.table(&rel.target_table) else {
                continue;
            };
            let constraint = format!("references {}({})", target.name, rel.target_column);
            let column = tables
                .iter_mut()
                .find(|t| t.id == rel.source_table)
                .and_then(|t| t.columns.iter_mut().find(|c| c.name == rel.source_column));
            if let Some(column) = column {
                if !column.constraints.iter().any(|c| c.eq_ignore_ascii_case(&constraint)) {
                    column.constraints.push(constraint);
                }
            }
        }
        tables
    }
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_primary)
    }
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            is_primary: false,
            is_foreign: false,
            constraints: Vec::new(),
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        if !has_constraint(&self.constraints, "primary key") {
            self.constraints.push("primary key".to_string());
        }
        self
    }

    pub fn foreign(mut self) -> Self {
        self.is_foreign = true;
        self
    }
}

impl Relationship {
    pub fn source(&self) -> FieldRef<'_> {
        FieldRef::new(&self.source_table, &self.source_column)
    }

    pub fn target(&self) -> FieldRef<'_> {
        FieldRef::new(&self.target_table, &self.target_column)
    }

    /// Direction-insensitive endpoint match.
    pub fn connects(&self, a: FieldRef<'_>, b: FieldRef<'_>) -> bool {
        (self.source() == a && self.target() == b) || (self.source() == b && self.target() == a)
    }

    pub fn edge_id(&self) -> String {
        format!(
            "{}.{}->{}.{}",
            self.source_table, self.source_column, self.target_table, self.target_column
        )
    }
}

fn has_constraint(constraints: &[String], needle: &str) -> bool {
    constraints
        .iter()
        .any(|c| c.to_lowercase().contains(needle))
}

// Wire shapes. Everything optional is resolved in the `From` impls below.

#[derive(Deserialize)]
struct SchemaDoc {
    tables: Vec<Table>,
    #[serde(default)]
    relationships: Option<Vec<Relationship>>,
}

#[derive(Deserialize)]
struct TableDoc {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default, alias = "fields")]
    columns: Vec<Column>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnDoc {
    name: String,
    #[serde(rename = "type", default)]
    column_type: Option<String>,
    #[serde(default)]
    is_primary: Option<bool>,
    #[serde(default)]
    is_foreign: Option<bool>,
    #[serde(default)]
    constraints: Vec<String>,
}

impl From<ColumnDoc> for Column {
    fn from(doc: ColumnDoc) -> Self {
        let is_primary = doc
            .is_primary
            .unwrap_or_else(|| has_constraint(&doc.constraints, "primary key"));
        let is_foreign = doc.is_foreign.unwrap_or_else(|| {
            has_constraint(&doc.constraints, "foreign key")
                || has_constraint(&doc.constraints, "references")
        });
        Column {
            name: doc.name,
            column_type: doc.column_type.unwrap_or_default(),
            is_primary,
            is_foreign,
            constraints: doc.constraints,
        }
    }
}

impl From<TableDoc> for Table {
    fn from(doc: TableDoc) -> Self {
        Table {
            id: doc.id.filter(|id| !id.is_empty()).unwrap_or_else(|| doc.name.clone()),
            name: doc.name,
            columns: doc.columns,
        }
    }
}

impl From<SchemaDoc> for Schema {
    fn from(doc: SchemaDoc) -> Self {
        let mut schema = Schema {
            tables: doc.tables,
            relationships: Vec::new(),
        };
        schema.relationships = match doc.relationships {
            Some(relationships) => resolve_relationships(&schema.tables, relationships),
            None => infer_relationships(&schema.tables),
        };
        schema
    }
}

static REFERENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)references\s+([a-z_][a-z0-9_]*)\s*\(\s*([a-z_][a-z0-9_]*)\s*\)")
        .expect("references pattern is valid")
});

fn find_table<'t>(tables: &'t [Table], reference: &str) -> Option<&'t Table> {
    tables
        .iter()
        .find(|t| t.id == reference)
        .or_else(|| tables.iter().find(|t| t.name.eq_ignore_ascii_case(reference)))
}

/// Point explicit relationships at table ids and drop the ones whose
/// endpoints do not exist. A dangling relationship would never reach the
/// graph, so keeping it would make the schema disagree with its own graph.
fn resolve_relationships(tables: &[Table], relationships: Vec<Relationship>) -> Vec<Relationship> {
    relationships
        .into_iter()
        .filter_map(|mut rel| {
            let source = find_table(tables, &rel.source_table)?;
            let target = find_table(tables, &rel.target_table)?;
            if source.column(&rel.source_column).is_none() || target.column(&rel.target_column).is_none() {
                tracing::debug!(relationship = %rel.edge_id(), "dropping relationship with unknown endpoint");
                return None;
            }
            rel.source_table = source.id.clone();
            rel.target_table = target.id.clone();
            Some(rel)
        })
        .collect()
}

/// `(table, column)` named by a `references table(column)` constraint.
pub fn references_target(constraint: &str) -> Option<(&str, &str)> {
    let caps = REFERENCES.captures(constraint)?;
    Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
}

/// Build relationships from `references table(column)` constraints.
fn infer_relationships(tables: &[Table]) -> Vec<Relationship> {
    let mut relationships: Vec<Relationship> = Vec::new();

    for table in tables {
        for column in &table.columns {
            for constraint in &column.constraints {
                let Some(caps) = REFERENCES.captures(constraint) else {
                    continue;
                };
                let target_name = &caps[1];
                let target_column = &caps[2];

                let Some(target) = find_table(tables, target_name) else {
                    continue;
                };
                if target.column(target_column).is_none() {
                    continue;
                }

                let rel = Relationship {
                    source_table: table.id.clone(),
                    target_table: target.id.clone(),
                    source_column: column.name.clone(),
                    target_column: target_column.to_string(),
                    kind: RelationshipKind::OneToMany,
                };
                if !relationships.iter().any(|r| r.connects(rel.source(), rel.target())) {
                    relationships.push(rel);
                }
            }
        }
    }

    relationships
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_defaults_flags_from_constraints() {
        let input = r#"{"tables":[{"name":"users","columns":[
            {"name":"id","type":"UUID","constraints":["PRIMARY KEY"]},
            {"name":"email","type":"VARCHAR"}
        ]}]}"#;
        let schema = Schema::from_json(input).unwrap();

        let users = &schema.tables[0];
        assert_eq!(users.id, "users");
        assert!(users.columns[0].is_primary);
        assert!(!users.columns[0].is_foreign);
        assert!(!users.columns[1].is_primary);
        assert!(users.columns[1].constraints.is_empty());
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn test_decode_infers_relationships_from_references() {
        let input = r#"{"tables":[
            {"name":"users","columns":[{"name":"id","type":"UUID","constraints":["primary key"]}]},
            {"name":"orders","columns":[
                {"name":"id","type":"UUID","constraints":["primary key"]},
                {"name":"user_id","type":"UUID","constraints":["references users(id)"]}
            ]}
        ]}"#;
        let schema = Schema::from_json(input).unwrap();

        assert_eq!(schema.relationships.len(), 1);
        let rel = &schema.relationships[0];
        assert_eq!(rel.source(), FieldRef::new("orders", "user_id"));
        assert_eq!(rel.target(), FieldRef::new("users", "id"));
        assert_eq!(rel.kind, RelationshipKind::OneToMany);
        assert!(schema.column(FieldRef::new("orders", "user_id")).unwrap().is_foreign);
    }

    #[test]
    fn test_decode_skips_unknown_reference_targets() {
        let input = r#"{"tables":[
            {"name":"orders","columns":[{"name":"user_id","type":"UUID","constraints":["references accounts(id)"]}]}
        ]}"#;
        let schema = Schema::from_json(input).unwrap();
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn test_explicit_relationships_are_not_inferred_over() {
        let input = r#"{"tables":[
            {"name":"users","columns":[{"name":"id","type":"UUID"}]},
            {"name":"orders","columns":[{"name":"user_id","type":"UUID","constraints":["references users(id)"]}]}
        ],"relationships":[]}"#;
        let schema = Schema::from_json(input).unwrap();
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn test_missing_tables_is_an_error() {
        assert!(Schema::from_json(r#"{"relationships":[]}"#).is_err());
        assert!(Schema::from_json("not json").is_err());
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let schema = Schema {
            tables: vec![Table {
                id: "users".to_string(),
                name: "users".to_string(),
                columns: vec![Column::new("id", "UUID").primary()],
            }],
            relationships: vec![],
        };
        let json = schema.to_json();
        let decoded = Schema::from_json(&json).unwrap();
        assert_eq!(decoded, schema);
        assert_eq!(decoded.to_json(), json);
        assert!(json.contains(r#""isPrimary":true"#));
        assert!(json.contains(r#""type":"UUID""#));
    }

    #[test]
    fn test_relationship_kind_wire_names() {
        let rel: Relationship = serde_json::from_str(
            r#"{"sourceTable":"a","targetTable":"b","sourceColumn":"x","targetColumn":"y","relationship":"many-to-many"}"#,
        )
        .unwrap();
        assert_eq!(rel.kind, RelationshipKind::ManyToMany);
        assert_eq!(RelationshipKind::from_str("One-To-One"), Some(RelationshipKind::OneToOne));
        assert_eq!(RelationshipKind::from_str("some"), None);
    }

    #[test]
    fn test_references_survive_export_and_decode() {
        let input = r#"{"tables":[
            {"name":"users","columns":[{"name":"id","type":"UUID","constraints":["primary key"]}]},
            {"name":"orders","columns":[{"name":"user_id","type":"UUID"}]}
        ],"relationships":[
            {"sourceTable":"orders","targetTable":"users","sourceColumn":"user_id","targetColumn":"id","kind":"one-to-many"}
        ]}"#;
        let schema = Schema::from_json(input).unwrap();
        let tables = schema.tables_with_references();
        assert_eq!(tables[1].columns[0].constraints, vec!["references users(id)".to_string()]);

        let payload = serde_json::json!({ "tables": tables });
        let decoded = Schema::from_value(payload).unwrap();
        assert_eq!(decoded.relationships.len(), 1);
        assert_eq!(decoded.relationships[0].source(), FieldRef::new("orders", "user_id"));
    }

    #[test]
    fn test_connects_is_direction_insensitive() {
        let rel = Relationship {
            source_table: "orders".to_string(),
            target_table: "users".to_string(),
            source_column: "user_id".to_string(),
            target_column: "id".to_string(),
            kind: RelationshipKind::OneToMany,
        };
        let a = FieldRef::new("orders", "user_id");
        let b = FieldRef::new("users", "id");
        assert!(rel.connects(a, b));
        assert!(rel.connects(b, a));
        assert!(!rel.connects(a, a));
    }

    #[test]
    fn test_dangling_explicit_relationships_are_dropped() {
        let input = r#"{"tables":[
            {"name":"orders","columns":[{"name":"user_id","type":"UUID"}]}
        ],"relationships":[
            {"sourceTable":"orders","targetTable":"users","sourceColumn":"user_id","targetColumn":"id"},
            {"sourceTable":"orders","targetTable":"orders","sourceColumn":"missing","targetColumn":"user_id"}
        ]}"#;
        let schema = Schema::from_json(input).unwrap();
        assert!(schema.relationships.is_empty());
    }

    #[test]
    fn test_explicit_relationships_resolve_names_to_ids() {
        let input = r#"{"tables":[
            {"id":"t1","name":"Users","columns":[{"name":"id","type":"UUID","constraints":["primary key"]}]},
            {"id":"t2","name":"orders","columns":[{"name":"user_id","type":"UUID"}]}
        ],"relationships":[
            {"sourceTable":"orders","targetTable":"users","sourceColumn":"user_id","targetColumn":"id"}
        ]}"#;
        let schema = Schema::from_json(input).unwrap();
        assert_eq!(schema.relationships[0].source(), FieldRef::new("t2", "user_id"));
        assert_eq!(schema.relationships[0].target(), FieldRef::new("t1", "id"));
    }

    #[test]
    fn test_export_drops_stale_references() {
        let input = r#"{"tables":[
            {"name":"users","columns":[{"name":"id","type":"UUID","constraints":["primary key"]}]},
            {"name":"orders","columns":[{"name":"user_id","type":"UUID","constraints":["NOT NULL","REFERENCES users(id)"]}]}
        ],"relationships":[]}"#;
        let schema = Schema::from_json(input).unwrap();

        let tables = schema.tables_with_references();
        assert_eq!(tables[1].columns[0].constraints, vec!["NOT NULL".to_string()]);

        let decoded = Schema::from_value(serde_json::json!({ "tables": tables })).unwrap();
        assert!(decoded.relationships.is_empty());
    }

    #[test]
    fn test_inference_needs_an_existing_target_column() {
        let input = r#"{"tables":[
            {"name":"users","columns":[{"name":"id","type":"UUID"}]},
            {"name":"orders","columns":[{"name":"user_id","type":"UUID","constraints":["references users(uuid)"]}]}
        ]}"#;
        assert!(Schema::from_json(input).unwrap().relationships.is_empty());
    }
}
