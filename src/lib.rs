#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod ir;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod schema;
#[cfg(feature = "server")]
pub mod server;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use enrich::{HttpRecordSource, RecordSource, StaticRecords};
pub use error::{PipelineError, ValidationError};
pub use layout::{LayoutKind, Registry};
pub use pipeline::{ImageRequest, ImageResponse, OutputKind, Pipeline, RenderedOutput};
