use unicode_width::UnicodeWidthStr;

use crate::schema::Column;

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_padding: f64,
    /// Room reserved for the PK/FK marker in front of a field row
    pub badge_width: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 20.0,
            padding_x: 12.0,
            padding_y: 8.0,
            header_padding: 4.0,
            badge_width: 24.0,
            min_node_width: 160.0,
            min_node_height: 60.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn header_height(&self) -> f64 {
        self.line_height + self.header_padding * 2.0
    }

    pub fn node_size(&self, label: &str, fields: &[Column]) -> (f64, f64) {
        let header_width = self.text_width(label);

        let max_field_width = fields
            .iter()
            .map(|f| {
                let badge = if f.is_primary || f.is_foreign {
                    self.badge_width
                } else {
                    0.0
                };
                badge + self.text_width(&f.name) + self.text_width(&f.column_type) + self.char_width * 2.0
            })
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_field_width) + self.padding_x * 2.0;
        let width = content_width.max(self.min_node_width);

        let body_height = if fields.is_empty() {
            0.0
        } else {
            fields.len() as f64 * self.line_height + self.padding_y * 2.0
        };

        let height = (self.header_height() + body_height).max(self.min_node_height);

        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_width() {
        let m = TextMetrics::default();
        assert_eq!(m.text_width("users"), 5.0 * 8.0);
    }

    #[test]
    fn test_unicode_width() {
        let m = TextMetrics::default();
        // 全角文字は幅2
        assert_eq!(m.text_width("ユーザー"), 8.0 * 8.0);
    }

    #[test]
    fn test_node_size_no_fields() {
        let m = TextMetrics::default();
        let (w, h) = m.node_size("users", &[]);
        assert_eq!(w, m.min_node_width);
        assert_eq!(h, m.min_node_height);
    }

    #[test]
    fn test_node_size_grows_with_fields() {
        let m = TextMetrics::default();
        let fields = vec![
            Column::new("id", "UUID").primary(),
            Column::new("a_rather_long_column_name", "TIMESTAMP WITH TIME ZONE"),
            Column::new("email", "VARCHAR"),
        ];
        let (w, h) = m.node_size("users", &fields);
        assert!(w > m.min_node_width);
        assert_eq!(h, m.header_height() + 3.0 * m.line_height + m.padding_y * 2.0);
    }

    #[test]
    fn test_key_badge_adds_width() {
        let m = TextMetrics {
            min_node_width: 0.0,
            ..TextMetrics::default()
        };
        let plain = m.node_size("t", &[Column::new("id", "INT")]);
        let keyed = m.node_size("t", &[Column::new("id", "INT").primary()]);
        assert_eq!(keyed.0 - plain.0, m.badge_width);
    }
}
