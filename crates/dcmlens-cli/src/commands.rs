use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use dcmlens_dataset::{
    parse_tag, resolve, DatasetParser, DicomParser, ElementValue, PixelGrid, StructuredDataset,
};
use dcmlens_render::{element_headers, render};
use dcmlens_server::{DcmlensServer, ServerConfig};
use dcmlens_service::TagData;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Inspect(args) => cmd_inspect(args, &cli.format),
        Command::Render(args) => cmd_render(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "loading server config");
            ServerConfig::load(path)?
        }
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.upload_dir {
        config.upload_dir = dir;
    }

    info!(
        bind = %config.bind_addr,
        upload_dir = %config.upload_dir.display(),
        max_upload_size = config.max_upload_size,
        "starting server"
    );
    let server = DcmlensServer::open(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

/// What `inspect` reports about one file.
#[derive(Debug, Serialize)]
struct InspectReport {
    file: String,
    tag_data: TagData,
    value: ElementValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pixel_shape: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    png_error: Option<String>,
    headers: BTreeMap<String, String>,
}

fn load(path: &Path) -> anyhow::Result<StructuredDataset> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    DicomParser
        .parse(&bytes)
        .with_context(|| format!("{} is not a readable DICOM file", path.display()))
}

fn inspect_report(file: &Path, dataset: &StructuredDataset, tag: &str) -> anyhow::Result<InspectReport> {
    let requested = parse_tag(tag)?;
    let element = resolve(dataset, requested)
        .with_context(|| format!("Tag {} not found in DICOM file", tag.trim()))?;
    Ok(InspectReport {
        file: file.display().to_string(),
        tag_data: TagData::from(element),
        value: element.value.clone(),
        pixel_shape: dataset.pixels().map(PixelGrid::shape),
        png_error: render(dataset).err().map(|e| e.to_string()),
        headers: element_headers(dataset),
    })
}

fn value_text(value: &ElementValue) -> String {
    match value {
        ElementValue::Scalar(s) => s.clone(),
        ElementValue::Sequence(items) => items.join(", "),
        ElementValue::Empty => "(empty)".to_string(),
        ElementValue::Nested => "(sequence of items)".to_string(),
        ElementValue::Unsupported(reason) => format!("({reason})"),
    }
}

fn cmd_inspect(args: InspectArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let dataset = load(&args.file)?;
    let report = inspect_report(&args.file, &dataset, &args.tag)?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.file.bold());
    println!(
        "  {} {}  {} {}  {} {}",
        "Tag:".dimmed(),
        report.tag_data.tag.yellow(),
        "Keyword:".dimmed(),
        report.tag_data.keyword.cyan(),
        "VR:".dimmed(),
        report.tag_data.vr
    );
    println!("  {} {}", "Value:".dimmed(), value_text(&report.value));
    match (&report.pixel_shape, &report.png_error) {
        (_, Some(err)) => println!("  {} {}", "Preview:".dimmed(), err.yellow()),
        (Some(shape), None) => println!("  {} {:?}", "Pixels:".dimmed(), shape),
        (None, None) => {}
    }
    if !report.headers.is_empty() {
        println!("  {}", "Headers:".dimmed());
        for (name, value) in &report.headers {
            println!("    {}: {}", name.green(), value);
        }
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let dataset = load(&args.file)?;
    let image = render(&dataset)?;
    std::fs::write(&args.output, &image.png)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!(
        "{} Wrote {}x{} preview to {}",
        "✓".green().bold(),
        image.width,
        image.height,
        args.output.display().to_string().bold()
    );
    Ok(())
}
