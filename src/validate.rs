//! Edit-time validation: names, table saves and relationship inserts.
//!
//! Every failure carries its own message and is shown inline by the caller.
//! Nothing here is fatal; a rejected edit leaves the schema untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::schema::{Column, FieldRef, RelationshipKind, Schema};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z][a-z0-9_]*$").expect("name pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Table name '{0}' must start with a letter and contain only letters, digits and underscores")]
    InvalidTableName(String),
    #[error("Field name '{0}' must start with a letter and contain only letters, digits and underscores")]
    InvalidFieldName(String),
    #[error("Table must have at least one field")]
    NoFields,
    #[error("Table must have a primary key")]
    MissingPrimaryKey,
    #[error("Table can only have one primary key, found {0}")]
    MultiplePrimaryKeys(usize),
    #[error("Duplicate field name '{0}'")]
    DuplicateField(String),
    #[error("A table named '{0}' already exists")]
    DuplicateTable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelationshipError {
    #[error("Please select both a source and a target field")]
    MissingEndpoint,
    #[error("Table '{0}' does not exist")]
    UnknownTable(String),
    #[error("Field '{column}' does not exist in table '{table}'")]
    UnknownField { table: String, column: String },
    #[error("These fields are already related")]
    AlreadyRelated,
    #[error("Cannot relate date/time field '{temporal}' to non date/time field '{other}'")]
    TemporalMismatch { temporal: String, other: String },
    #[error("A one-to-many relationship needs a primary or foreign key on one side")]
    MissingKey,
    #[error("Identifier field '{id}' should not be related to timestamp field '{timestamp}'")]
    IdentifierToTimestamp { id: String, timestamp: String },
}

/// Which relationship heuristics are enforced. All are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipPolicy {
    pub forbid_temporal_mismatch: bool,
    pub require_keys_for_one_to_many: bool,
    pub forbid_id_to_timestamp: bool,
}

impl Default for RelationshipPolicy {
    fn default() -> Self {
        Self {
            forbid_temporal_mismatch: true,
            require_keys_for_one_to_many: true,
            forbid_id_to_timestamp: true,
        }
    }
}

/// A relationship the user is composing; endpoints may still be unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationshipDraft {
    pub source_table: Option<String>,
    pub source_column: Option<String>,
    pub target_table: Option<String>,
    pub target_column: Option<String>,
    pub kind: RelationshipKind,
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

pub fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTableName(name.to_string()))
    }
}

pub fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFieldName(name.to_string()))
    }
}

/// Save gate for the table edit form.
pub fn validate_table(name: &str, columns: &[Column]) -> Result<(), ValidationError> {
    validate_table_name(name)?;

    if columns.is_empty() {
        return Err(ValidationError::NoFields);
    }

    let mut seen = HashSet::new();
    for column in columns {
        validate_field_name(&column.name)?;
        if !seen.insert(column.name.to_lowercase()) {
            return Err(ValidationError::DuplicateField(column.name.clone()));
        }
    }

    match columns.iter().filter(|c| c.is_primary).count() {
        0 => Err(ValidationError::MissingPrimaryKey),
        1 => Ok(()),
        n => Err(ValidationError::MultiplePrimaryKeys(n)),
    }
}

/// Table names must stay unique ignoring case, since exported `references`
/// constraints resolve tables by name. `editing` is the id of the table being
/// renamed, which may keep its own name.
pub fn validate_unique_table_name(
    schema: &Schema,
    name: &str,
    editing: Option<&str>,
) -> Result<(), ValidationError> {
    let taken = schema
        .tables
        .iter()
        .filter(|t| Some(t.id.as_str()) != editing)
        .any(|t| t.name.eq_ignore_ascii_case(name));
    if taken {
        Err(ValidationError::DuplicateTable(name.to_string()))
    } else {
        Ok(())
    }
}

fn selected(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Pre-insert gate for a new relationship.
pub fn validate_relationship(
    schema: &Schema,
    draft: &RelationshipDraft,
    policy: &RelationshipPolicy,
) -> Result<(), RelationshipError> {
    let (Some(source_table), Some(source_column), Some(target_table), Some(target_column)) = (
        selected(&draft.source_table),
        selected(&draft.source_column),
        selected(&draft.target_table),
        selected(&draft.target_column),
    ) else {
        return Err(RelationshipError::MissingEndpoint);
    };

    let source_ref = FieldRef::new(source_table, source_column);
    let target_ref = FieldRef::new(target_table, target_column);
    let source = lookup(schema, source_ref)?;
    let target = lookup(schema, target_ref)?;

    if source_ref == target_ref || schema.has_relationship_between(source_ref, target_ref) {
        return Err(RelationshipError::AlreadyRelated);
    }

    check_pair(source, target, draft.kind, policy)
}

/// The column-level heuristics, independent of where the columns live. Also
/// used to re-check existing relationships after a table edit.
pub fn check_pair(
    source: &Column,
    target: &Column,
    kind: RelationshipKind,
    policy: &RelationshipPolicy,
) -> Result<(), RelationshipError> {
    if policy.forbid_temporal_mismatch {
        match (is_temporal(source), is_temporal(target)) {
            (true, false) => {
                return Err(RelationshipError::TemporalMismatch {
                    temporal: source.name.clone(),
                    other: target.name.clone(),
                });
            }
            (false, true) => {
                return Err(RelationshipError::TemporalMismatch {
                    temporal: target.name.clone(),
                    other: source.name.clone(),
                });
            }
            _ => {}
        }
    }

    if policy.require_keys_for_one_to_many
        && kind == RelationshipKind::OneToMany
        && !(source.is_primary || source.is_foreign || target.is_primary || target.is_foreign)
    {
        return Err(RelationshipError::MissingKey);
    }

    if policy.forbid_id_to_timestamp {
        for (a, b) in [(source, target), (target, source)] {
            if is_identifier_name(&a.name) && is_timestamp_name(&b.name) {
                return Err(RelationshipError::IdentifierToTimestamp {
                    id: a.name.clone(),
                    timestamp: b.name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn lookup<'s>(schema: &'s Schema, field: FieldRef<'_>) -> Result<&'s Column, RelationshipError> {
    let table = schema
        .table(field.table)
        .ok_or_else(|| RelationshipError::UnknownTable(field.table.to_string()))?;
    table
        .column(field.column)
        .ok_or_else(|| RelationshipError::UnknownField {
            table: field.table.to_string(),
            column: field.column.to_string(),
        })
}

pub fn is_temporal(column: &Column) -> bool {
    let typ = column.column_type.to_uppercase();
    typ.contains("DATE") || typ.contains("TIME")
}

fn is_identifier_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "id" || name.ends_with("_id")
}

fn is_timestamp_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "created_at" || name == "updated_at" || name.ends_with("_at")
}
