//! Edge style conventions, keyed by relationship kind.

use serde::{Deserialize, Serialize};

use crate::schema::RelationshipKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub stroke: String,
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_dasharray: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMarker {
    #[serde(rename = "type")]
    pub marker_type: String,
    pub color: String,
    pub width: f64,
    pub height: f64,
}

const ONE_TO_ONE_COLOR: &str = "#3b82f6";
const ONE_TO_MANY_COLOR: &str = "#10b981";
const MANY_TO_MANY_COLOR: &str = "#f59e0b";

impl EdgeStyle {
    pub fn for_kind(kind: RelationshipKind) -> Self {
        let (stroke, dash) = match kind {
            RelationshipKind::OneToOne => (ONE_TO_ONE_COLOR, None),
            RelationshipKind::OneToMany => (ONE_TO_MANY_COLOR, Some("5,5")),
            RelationshipKind::ManyToMany => (MANY_TO_MANY_COLOR, Some("10,5")),
        };
        Self {
            stroke: stroke.to_string(),
            stroke_width: 2.0,
            stroke_dasharray: dash.map(str::to_string),
        }
    }
}

impl EdgeMarker {
    pub fn for_kind(kind: RelationshipKind) -> Self {
        Self {
            marker_type: "arrowclosed".to_string(),
            color: EdgeStyle::for_kind(kind).stroke,
            width: 20.0,
            height: 20.0,
        }
    }
}

/// Many-to-many edges are drawn animated.
pub fn is_animated(kind: RelationshipKind) -> bool {
    matches!(kind, RelationshipKind::ManyToMany)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_styles_are_distinct_per_kind() {
        let one = EdgeStyle::for_kind(RelationshipKind::OneToOne);
        let many = EdgeStyle::for_kind(RelationshipKind::OneToMany);
        let m2m = EdgeStyle::for_kind(RelationshipKind::ManyToMany);

        assert_eq!(one.stroke_dasharray, None);
        assert_eq!(many.stroke_dasharray.as_deref(), Some("5,5"));
        assert_eq!(m2m.stroke_dasharray.as_deref(), Some("10,5"));
        assert_ne!(one.stroke, many.stroke);
        assert_ne!(many.stroke, m2m.stroke);
    }

    #[test]
    fn test_marker_follows_stroke_color() {
        let marker = EdgeMarker::for_kind(RelationshipKind::OneToMany);
        assert_eq!(marker.color, ONE_TO_MANY_COLOR);
        assert!(is_animated(RelationshipKind::ManyToMany));
        assert!(!is_animated(RelationshipKind::OneToOne));
    }
}
