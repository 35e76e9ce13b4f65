use std::fmt;

use crate::pipeline::Stage;

/// Any failure that aborts an image request.
///
/// Record enrichment never produces one of these; it degrades to "no record" instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("layout `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to render layout: {0}")]
    Render(#[from] RenderError),
    #[error("failed to rasterize svg: {0}")]
    Raster(#[from] RasterError),
}

impl PipelineError {
    /// The orchestrator stage the request was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::NotFound(_) | PipelineError::Validation(_) => Stage::Resolving,
            PipelineError::Render(_) | PipelineError::Raster(_) => Stage::Rendering,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for `{field}`: {constraint}")]
pub struct ValidationError {
    pub field: String,
    pub constraint: Constraint,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}

/// The schema rule a value failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Required,
    NonEmpty,
    AbsoluteUrl,
    OneOf(&'static [&'static str]),
    Pattern(&'static str),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => f.write_str("required"),
            Constraint::NonEmpty => f.write_str("expected a non-empty string"),
            Constraint::AbsoluteUrl => f.write_str("expected an absolute URL"),
            Constraint::OneOf(options) => write!(f, "expected one of {}", options.join(", ")),
            Constraint::Pattern(pattern) => write!(f, "expected a value matching {pattern}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("configuration does not match layout `{layout}`: {source}")]
    Config {
        layout: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("non-finite geometry in {element}")]
    InvalidGeometry { element: &'static str },
    #[error("scene has an empty canvas ({width}x{height})")]
    EmptyCanvas { width: f32, height: f32 },
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[cfg(feature = "png")]
    #[error("failed to parse svg: {0}")]
    Parse(#[from] usvg::Error),
    #[error("failed to allocate a {width}x{height} pixmap")]
    Allocation { width: u32, height: u32 },
    #[error("failed to encode png: {0}")]
    Encode(String),
    #[error("png output is not enabled in this build")]
    Unsupported,
}
