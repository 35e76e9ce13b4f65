use crate::config::{Config, load_config};
use crate::enrich::{HttpRecordSource, RecordSource, StaticRecords};
use crate::layout::{LayoutSummary, Registry};
use crate::pipeline::{
    FILE_TYPE_PARAM, ImageRequest, LAYOUT_PARAM, Pipeline, RenderedOutput, SEED_PARAM,
};
use crate::schema::RawParams;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "og-image", version, about = "Open Graph image generator")]
pub struct Args {
    /// Config file (JSON5)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the image API over HTTP
    Serve {
        /// Listen address, overrides the config file and environment
        #[arg(short = 'a', long = "addr")]
        addr: Option<String>,
    },
    /// Render a single image
    Render(RenderArgs),
    /// Print the registered layouts and their properties as JSON
    Layouts,
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Layout name (case-insensitive)
    #[arg(short = 'l', long = "layout")]
    pub layout: String,

    /// Layout property as KEY=VALUE; repeatable
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Record index to bind
    #[arg(short = 's', long = "seed")]
    pub seed: Option<String>,

    /// Output format
    #[arg(short = 'e', long = "format", value_enum, default_value = "svg")]
    pub format: OutputFormat,

    /// Output file. Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Records file (`{ "data": [...] }`) used instead of the record service
    #[arg(short = 'r', long = "records")]
    pub records: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

impl OutputFormat {
    fn as_param(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(crate::server::serve(config))
        }
        Command::Render(render_args) => render(&config, render_args),
        Command::Layouts => print_layouts(&Registry::builtin()),
    }
}

fn render(config: &Config, args: RenderArgs) -> Result<()> {
    if args.format == OutputFormat::Png {
        ensure_output(&args.output, "png")?;
    }

    let records: Arc<dyn RecordSource> = match args.records.as_deref() {
        Some(path) => Arc::new(read_records(path)?),
        None => Arc::new(HttpRecordSource::new(&config.upstream)),
    };
    let pipeline = Pipeline::new(Arc::new(Registry::builtin()), records, config);

    let request = ImageRequest::from_query(request_params(&args))?;
    match pipeline.generate(&request)? {
        RenderedOutput::Svg(svg) => write_output_svg(&svg, args.output.as_deref()),
        RenderedOutput::Png(png) => {
            let output = ensure_output(&args.output, "png")?;
            std::fs::write(&output, png)
                .with_context(|| format!("failed to write {}", output.display()))
        }
    }
}

fn request_params(args: &RenderArgs) -> RawParams {
    let mut params: RawParams = args.params.iter().cloned().collect();
    params.insert(LAYOUT_PARAM.to_string(), args.layout.clone());
    params.insert(FILE_TYPE_PARAM.to_string(), args.format.as_param().to_string());
    if let Some(seed) = &args.seed {
        params.insert(SEED_PARAM.to_string(), seed.clone());
    }
    params
}

fn read_records(path: &Path) -> Result<StaticRecords> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read records from {}", path.display()))?;
    StaticRecords::from_json(&body)
        .with_context(|| format!("invalid records file {}", path.display()))
}

fn print_layouts(registry: &Registry) -> Result<()> {
    let summaries: Vec<LayoutSummary> = registry.iter().map(|layout| layout.describe()).collect();
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &summaries)?;
    writeln!(stdout)?;
    Ok(())
}

fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, svg)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(svg.as_bytes())?;
            writeln!(stdout)?;
            Ok(())
        }
    }
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}
