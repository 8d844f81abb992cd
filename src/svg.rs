use crate::graph::{GraphEdge, GraphNode, VisualGraph};
use crate::layout::Bounds;
use crate::measure::TextMetrics;
use crate::schema::RelationshipKind;
use std::collections::HashMap;
use std::fmt::Write;

const KINDS: [RelationshipKind; 3] = [
    RelationshipKind::OneToOne,
    RelationshipKind::OneToMany,
    RelationshipKind::ManyToMany,
];

pub struct SvgRenderer {
    metrics: TextMetrics,
    margin: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            metrics: TextMetrics::default(),
            margin: 40.0,
        }
    }
}

impl SvgRenderer {
    pub fn render(&self, graph: &VisualGraph) -> String {
        let mut svg = String::new();

        let bounds = Bounds::of(&graph.nodes).unwrap_or(Bounds {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 0.0,
            max_y: 0.0,
        });
        // Shift everything so the top-left node sits at (margin, margin)
        let dx = self.margin - bounds.min_x;
        let dy = self.margin - bounds.min_y;
        let width = bounds.width() + self.margin * 2.0;
        let height = bounds.height() + self.margin * 2.0;

        writeln!(
            &mut svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            width, height, width, height
        )
        .unwrap();

        writeln!(
            &mut svg,
            r#"<style>
  .table-bg {{ fill: #fff; }}
  .table-header {{ fill: #1e293b; }}
  .table-border {{ fill: none; stroke: #334155; stroke-width: 1.5; }}
  .table-name {{ font-family: monospace; font-size: 14px; font-weight: bold; fill: #fff; }}
  .field-text {{ font-family: monospace; font-size: 12px; fill: #0f172a; }}
  .pk {{ font-weight: bold; }}
  .fk {{ font-style: italic; }}
  .internal {{ fill: #94a3b8; }}
  .edge-label {{ font-family: monospace; font-size: 11px; fill: #475569; }}
</style>"#
        )
        .unwrap();

        writeln!(&mut svg, "<defs>").unwrap();
        for kind in KINDS {
            let style = crate::style::EdgeMarker::for_kind(kind);
            writeln!(
                &mut svg,
                r#"<marker id="arrow-{}" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M 0 0 L 10 5 L 0 10 z" fill="{}" /></marker>"#,
                kind.as_str(),
                style.color
            )
            .unwrap();
        }
        writeln!(&mut svg, "</defs>").unwrap();

        let node_map: HashMap<&str, &GraphNode> =
            graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        // Edges first so tables are drawn over them
        for edge in &graph.edges {
            if let (Some(from), Some(to)) = (
                node_map.get(edge.source.as_str()),
                node_map.get(edge.target.as_str()),
            ) {
                self.render_edge(&mut svg, edge, from, to, dx, dy);
            }
        }

        for node in &graph.nodes {
            self.render_node(&mut svg, node, dx, dy);
        }

        writeln!(&mut svg, "</svg>").unwrap();
        svg
    }

    fn render_node(&self, svg: &mut String, node: &GraphNode, dx: f64, dy: f64) {
        let x = node.position.x + dx;
        let y = node.position.y + dy;
        let w = node.width;
        let header_h = self.metrics.header_height();

        writeln!(
            svg,
            r#"<rect class="table-bg" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, node.height
        )
        .unwrap();
        writeln!(
            svg,
            r#"<rect class="table-header" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, header_h
        )
        .unwrap();
        writeln!(
            svg,
            r#"<text class="table-name" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            x + w / 2.0,
            y + header_h / 2.0 + 5.0,
            escape_xml(&node.data.label)
        )
        .unwrap();

        let mut field_y = y + header_h + self.metrics.padding_y + self.metrics.line_height * 0.7;
        for field in &node.data.fields {
            let column = &field.column;
            let mut class = "field-text".to_string();
            if column.is_primary {
                class.push_str(" pk");
            }
            if column.is_foreign {
                class.push_str(" fk");
            }
            if field.internal {
                class.push_str(" internal");
            }

            let badge = match (column.is_primary, column.is_foreign) {
                (true, _) => "PK ",
                (false, true) => "FK ",
                _ => "   ",
            };
            let text = format!("{}{}: {}", badge, column.name, column.column_type);

            writeln!(
                svg,
                r#"<text class="{}" x="{}" y="{}">{}</text>"#,
                class,
                x + self.metrics.padding_x,
                field_y,
                escape_xml(&text)
            )
            .unwrap();

            field_y += self.metrics.line_height;
        }

        writeln!(
            svg,
            r#"<rect class="table-border" x="{}" y="{}" width="{}" height="{}" rx="4" />"#,
            x, y, w, node.height
        )
        .unwrap();
    }

    fn render_edge(
        &self,
        svg: &mut String,
        edge: &GraphEdge,
        from: &GraphNode,
        to: &GraphNode,
        dx: f64,
        dy: f64,
    ) {
        let (x1, y1) = center(from, dx, dy);
        let (x2, y2) = center(to, dx, dy);

        let dash = edge
            .style
            .stroke_dasharray
            .as_deref()
            .map(|d| format!(r#" stroke-dasharray="{}""#, d))
            .unwrap_or_default();

        writeln!(
            svg,
            r#"<line class="edge" x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"{} marker-end="url(#arrow-{})" />"#,
            x1,
            y1,
            x2,
            y2,
            edge.style.stroke,
            edge.style.stroke_width,
            dash,
            edge.data.relationship.as_str()
        )
        .unwrap();

        let label = format!(
            "{} → {} ({})",
            edge.data.source_field,
            edge.data.target_field,
            edge.data.relationship.as_str()
        );
        writeln!(
            svg,
            r#"<text class="edge-label" x="{}" y="{}" text-anchor="middle">{}</text>"#,
            (x1 + x2) / 2.0,
            (y1 + y2) / 2.0 - 5.0,
            escape_xml(&label)
        )
        .unwrap();
    }
}

fn center(node: &GraphNode, dx: f64, dy: f64) -> (f64, f64) {
    (
        node.position.x + dx + node.width / 2.0,
        node.position.y + dy + node.height / 2.0,
    )
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
