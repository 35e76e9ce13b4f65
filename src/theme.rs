#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub font_family: String,
    pub mono_font_family: String,
    pub background: String,
    pub foreground: String,
    pub muted: String,
    pub accent: String,
    pub badge_background: String,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            mono_font_family: "JetBrains Mono, Menlo, ui-monospace, monospace".to_string(),
            background: "#0B0B10".to_string(),
            foreground: "#FFFFFF".to_string(),
            muted: "#6B7280".to_string(),
            accent: "#A855F7".to_string(),
            badge_background: "rgba(255,255,255,0.1)".to_string(),
        }
    }

    pub fn light() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            mono_font_family: "JetBrains Mono, Menlo, ui-monospace, monospace".to_string(),
            background: "#FFFFFF".to_string(),
            foreground: "#111827".to_string(),
            muted: "#6B7280".to_string(),
            accent: "#7C3AED".to_string(),
            badge_background: "rgba(17,24,39,0.06)".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
