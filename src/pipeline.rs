//! Request orchestration: resolve, enrich, render, and turn the outcome into a response.
//!
//! A request moves through `Resolving → Enriching → Rendering → Done` exactly once. Resolution
//! and rendering failures end it in `Failed`; enrichment never does.

use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::enrich::{EnrichedConfig, RecordSource, enrich};
use crate::error::{Constraint, PipelineError, RasterError, RenderError, ValidationError};
use crate::layout::{LayoutDefinition, Registry, RenderContext};
use crate::render::{Rasterizer, render_svg};
use crate::schema::{RawParams, resolve};
use crate::theme::Theme;

pub const CACHE_CONTROL: &str =
    "public, immutable, no-transform, s-maxage=31536000, max-age=31536000";
pub const ERROR_CONTENT_TYPE: &str = "text/html";
pub const STATUS_OK: u16 = 200;
pub const STATUS_FAILED: u16 = 500;

pub const LAYOUT_PARAM: &str = "layoutName";
pub const FILE_TYPE_PARAM: &str = "fileType";
pub const SEED_PARAM: &str = "seed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Enriching,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolving => "resolving",
            Stage::Enriching => "enriching",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
            Stage::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputKind {
    #[default]
    Svg,
    Png,
}

impl OutputKind {
    /// Unset or unrecognized values mean SVG.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
            Some("png") => OutputKind::Png,
            _ => OutputKind::Svg,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            OutputKind::Svg => "image/svg+xml",
            OutputKind::Png => "image/png",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Svg => "svg",
            OutputKind::Png => "png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub layout_name: String,
    pub output: OutputKind,
    pub seed: Option<String>,
    /// The full query; layout resolution ignores keys its schema does not declare.
    pub params: RawParams,
}

impl ImageRequest {
    pub fn from_query(params: RawParams) -> Result<Self, ValidationError> {
        let layout_name = params
            .get(LAYOUT_PARAM)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::new(LAYOUT_PARAM, Constraint::Required))?
            .to_string();
        let output = OutputKind::from_param(params.get(FILE_TYPE_PARAM).map(String::as_str));
        let seed = params.get(SEED_PARAM).cloned();
        Ok(Self {
            layout_name,
            output,
            seed,
            params,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedOutput {
    Svg(String),
    Png(Vec<u8>),
}

impl RenderedOutput {
    pub fn kind(&self) -> OutputKind {
        match self {
            RenderedOutput::Svg(_) => OutputKind::Svg,
            RenderedOutput::Png(_) => OutputKind::Png,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RenderedOutput::Svg(svg) => svg.into_bytes(),
            RenderedOutput::Png(png) => png,
        }
    }
}

/// Transport-neutral response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub cache_control: Option<&'static str>,
    pub body: Vec<u8>,
}

impl ImageResponse {
    pub fn success(output: RenderedOutput) -> Self {
        Self {
            status: STATUS_OK,
            content_type: output.kind().content_type(),
            cache_control: Some(CACHE_CONTROL),
            body: output.into_bytes(),
        }
    }

    pub fn failure(err: &PipelineError) -> Self {
        Self::error_page(&err.to_string())
    }

    /// Uniform error page carrying only the escaped message.
    pub fn error_page(message: &str) -> Self {
        let body = format!(
            "<h1>Internal Error</h1><pre><code>{}</code></pre>",
            sanitize_html(message)
        );
        Self {
            status: STATUS_FAILED,
            content_type: ERROR_CONTENT_TYPE,
            cache_control: None,
            body: body.into_bytes(),
        }
    }
}

/// Escapes markup-significant and control characters.
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '`' => out.push_str("&#x60;"),
            ch if ch.is_control() => out.push_str(&format!("&#x{:X};", ch as u32)),
            ch => out.push(ch),
        }
    }
    out
}

pub struct Pipeline {
    registry: Arc<Registry>,
    records: Arc<dyn RecordSource>,
    rasterizer: Rasterizer,
    theme: Theme,
    width: f32,
    height: f32,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("layouts", &self.registry.names())
            .field("rasterizer", &self.rasterizer)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(registry: Arc<Registry>, records: Arc<dyn RecordSource>, config: &Config) -> Self {
        Self {
            registry,
            records,
            rasterizer: Rasterizer::new(&config.render),
            theme: config.theme.clone(),
            width: config.render.width,
            height: config.render.height,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs a request from raw query parameters. Never fails: errors become a 500 response.
    pub fn handle(&self, query: RawParams) -> ImageResponse {
        let result = ImageRequest::from_query(query)
            .map_err(PipelineError::from)
            .and_then(|request| self.generate(&request));
        match result {
            Ok(output) => ImageResponse::success(output),
            Err(err) => {
                tracing::error!(stage = %err.stage(), error = %err, "image request failed");
                ImageResponse::failure(&err)
            }
        }
    }

    pub fn generate(&self, request: &ImageRequest) -> Result<RenderedOutput, PipelineError> {
        let span = tracing::info_span!(
            "image",
            layout = %request.layout_name,
            output = request.output.extension()
        );
        let _guard = span.enter();

        tracing::debug!(stage = %Stage::Resolving);
        let layout = self.registry.lookup(&request.layout_name)?;
        let config = resolve(layout, &request.params)?;

        tracing::debug!(stage = %Stage::Enriching);
        let enriched = enrich(config, request.seed.as_deref(), self.records.as_ref());

        tracing::debug!(stage = %Stage::Rendering, record = enriched.record_data().is_some());
        let svg = self.render_svg(layout, &enriched)?;
        let output = match request.output {
            OutputKind::Svg => RenderedOutput::Svg(svg),
            OutputKind::Png => RenderedOutput::Png(self.rasterize(&svg)?),
        };

        tracing::debug!(stage = %Stage::Done);
        Ok(output)
    }

    pub fn render_svg(
        &self,
        layout: &LayoutDefinition,
        config: &EnrichedConfig,
    ) -> Result<String, RenderError> {
        let ctx = RenderContext {
            theme: &self.theme,
            width: self.width,
            height: self.height,
        };
        let scene = layout.render(config, &ctx)?;
        render_svg(&scene)
    }

    pub fn rasterize(&self, svg: &str) -> Result<Vec<u8>, RasterError> {
        self.rasterizer.rasterize(svg)
    }
}
