use serde::{Deserialize, Serialize};

pub const UNKNOWN_CATEGORY: &str = "UNKNOWN";
pub const UNKNOWN_COLOR: &str = "#6b7280";

/// How a page category is drawn and named
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStyle {
    pub name: String,
    pub label: String,
    pub color: String,
}

impl CategoryStyle {
    pub fn new(name: &str, label: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

/// Lookup table from category name to label and color.
///
/// Lookups never fail: an unrecognized or missing category resolves to the
/// `UNKNOWN` entry, and if the table itself lacks one a neutral gray is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    entries: Vec<CategoryStyle>,
    fallback: CategoryStyle,
}

impl CategoryTable {
    pub fn new(entries: Vec<CategoryStyle>) -> Self {
        let fallback = entries
            .iter()
            .find(|e| e.name == UNKNOWN_CATEGORY)
            .cloned()
            .unwrap_or_else(|| CategoryStyle::new(UNKNOWN_CATEGORY, "Unknown", UNKNOWN_COLOR));
        Self { entries, fallback }
    }

    /// Defaults extended or overridden by `overrides`, matched on name.
    pub fn with_overrides(overrides: &[CategoryStyle]) -> Self {
        let mut entries = Self::default().entries;
        for style in overrides {
            let name = style.name.to_uppercase();
            match entries.iter_mut().find(|e| e.name == name) {
                Some(existing) => {
                    existing.label = style.label.clone();
                    existing.color = style.color.clone();
                }
                None => entries.push(CategoryStyle {
                    name,
                    label: style.label.clone(),
                    color: style.color.clone(),
                }),
            }
        }
        Self::new(entries)
    }

    pub fn style(&self, category: Option<&str>) -> &CategoryStyle {
        let Some(name) = category.map(str::trim).filter(|c| !c.is_empty()) else {
            return &self.fallback;
        };
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .unwrap_or(&self.fallback)
    }

    pub fn color(&self, category: Option<&str>) -> &str {
        &self.style(category).color
    }

    /// Display label. Unlisted categories keep their own name rather than
    /// collapsing to "Unknown".
    pub fn label<'a>(&'a self, category: Option<&'a str>) -> &'a str {
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(name) => self
                .entries
                .iter()
                .find(|e| e.name.eq_ignore_ascii_case(name))
                .map(|e| e.label.as_str())
                .unwrap_or(name),
            None => &self.fallback.label,
        }
    }

    pub fn entries(&self) -> &[CategoryStyle] {
        &self.entries
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::new(vec![
            CategoryStyle::new("PRODUCT", "Products", "#3b82f6"),
            CategoryStyle::new("CATEGORY", "Categories", "#8b5cf6"),
            CategoryStyle::new("INFORMATION", "Information", "#10b981"),
            CategoryStyle::new("BLOG", "Blog", "#f59e0b"),
            CategoryStyle::new("CONTACT", "Contact", "#ec4899"),
            CategoryStyle::new("JOB", "Jobs", "#14b8a6"),
            CategoryStyle::new("LEGAL", "Legal", "#84cc16"),
            CategoryStyle::new("HOME", "Home", "#f97316"),
            CategoryStyle::new(UNKNOWN_CATEGORY, "Unknown", UNKNOWN_COLOR),
        ])
    }
}

/// Normalized category key used for clustering and legends.
pub fn category_key(category: Option<&str>) -> String {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string())
}

/// Parse `#rrggbb` into its components.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
