use crate::theme::Theme;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_ATTENDEES_PATH: &str = "/api/attendees";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
        }
    }
}

/// Where attendee records come from.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub api_url: String,
    pub attendees_path: String,
    /// No timeout unless configured.
    pub timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            attendees_path: DEFAULT_ATTENDEES_PATH.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    /// Family used by the rasterizer when an SVG font stack resolves to nothing installed.
    pub font_family: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 630.0,
            font_family: "Inter".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub render: RenderConfig,
    pub theme: Theme,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    mono_font_family: Option<String>,
    background: Option<String>,
    foreground: Option<String>,
    muted: Option<String>,
    accent: Option<String>,
    badge_background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    font_family: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpstreamConfigFile {
    api_url: Option<String>,
    attendees_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    render: Option<RenderConfigFile>,
    server: Option<ServerConfigFile>,
    upstream: Option<UpstreamConfigFile>,
}

/// Builds the startup configuration: defaults, then the optional JSON5 file, then environment.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    if let Some(path) = path {
        let contents = std::fs::read_to_string(path)?;
        apply_config_file(&mut config, &contents)?;
    }
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn apply_config_file(config: &mut Config, contents: &str) -> anyhow::Result<()> {
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.mono_font_family {
            config.theme.mono_font_family = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.foreground {
            config.theme.foreground = v;
        }
        if let Some(v) = vars.muted {
            config.theme.muted = v;
        }
        if let Some(v) = vars.accent {
            config.theme.accent = v;
        }
        if let Some(v) = vars.badge_background {
            config.theme.badge_background = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
        if let Some(v) = render.font_family {
            config.render.font_family = v;
        }
    }
    if !(config.render.width > 0.0 && config.render.height > 0.0) {
        return Err(anyhow::anyhow!(
            "render size must be positive, got {}x{}",
            config.render.width,
            config.render.height
        ));
    }

    if let Some(v) = parsed.server.and_then(|server| server.addr) {
        config.server.addr = v;
    }

    if let Some(upstream) = parsed.upstream {
        if let Some(v) = upstream.api_url {
            config.upstream.api_url = v;
        }
        if let Some(v) = upstream.attendees_path {
            config.upstream.attendees_path = v;
        }
        if upstream.timeout_secs.is_some() {
            config.upstream.timeout_secs = upstream.timeout_secs;
        }
    }

    Ok(())
}

/// `API_URL` and `OG_IMAGE_ADDR` win over the config file. Blank values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
    if let Some(v) = lookup("API_URL") {
        config.upstream.api_url = v;
    }
    if let Some(v) = lookup("OG_IMAGE_ADDR") {
        config.server.addr = v;
    }
}
