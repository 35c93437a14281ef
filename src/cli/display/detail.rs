//! Detail view builder for key-value display.

/// A builder for detail views (key-value display).
pub struct DetailView {
    title: String,
    sections: Vec<DetailSection>,
}

struct DetailSection {
    header: Option<String>,
    fields: Vec<(String, String)>,
    items: Vec<String>,
}

impl DetailView {
    /// A view headed by `title`.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sections: vec![DetailSection {
                header: None,
                fields: vec![],
                items: vec![],
            }],
        }
    }

    /// Add a key-value field to the current section.
    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.fields.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// Add a field only if the value is Some.
    pub fn field_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Start a new named section.
    pub fn section(mut self, header: &str) -> Self {
        self.sections.push(DetailSection {
            header: Some(header.to_string()),
            fields: vec![],
            items: vec![],
        });
        self
    }

    /// Add a bullet-point item to the current section.
    pub fn item(mut self, text: impl ToString) -> Self {
        if let Some(section) = self.sections.last_mut() {
            section.items.push(text.to_string());
        }
        self
    }

    /// Render the view as styled text.
    pub fn render(&self) -> String {
        let mut lines = vec![console::style(&self.title).bold().to_string()];
        let key_width = self
            .sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(12);

        for section in &self.sections {
            if let Some(header) = &section.header {
                lines.push(String::new());
                lines.push(console::style(header).bold().underlined().to_string());
            }
            for (key, value) in &section.fields {
                lines.push(format!(
                    "  {:<width$}  {}",
                    format!("{key}:"),
                    value,
                    width = key_width + 1
                ));
            }
            for item in &section.items {
                lines.push(format!("  {} {}", console::style("\u{2022}").dim(), item));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fields_and_items() {
        console::set_colors_enabled(false);
        let rendered = DetailView::new("Decision")
            .field("gate", "budget")
            .field_opt("checkpoint", None::<String>)
            .section("Alternatives")
            .item("reuse existing")
            .render();

        assert!(rendered.starts_with("Decision"));
        assert!(rendered.contains("gate:"));
        assert!(!rendered.contains("checkpoint"));
        assert!(rendered.contains("\u{2022} reuse existing"));
    }
}
