use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use form::{AttachedFile, DEFAULT_ENDPOINT, FormClient, Slot};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Storage request endpoint
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Form field as name=value, repeatable
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// JSON object of field values, applied before --field
    #[arg(long)]
    fields_json: Option<PathBuf>,

    #[arg(long)]
    manifest: Option<PathBuf>,

    #[arg(long)]
    sampling_permit: Option<PathBuf>,

    #[arg(long)]
    nagoya_permit: Option<PathBuf>,
}

fn parse_field(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got {raw:?}"))?;

    Ok((name.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}",
        )?
        .progress_chars("=> "),
    );

    let observer = {
        let pb = pb.clone();
        Arc::new(move |pct: u8| pb.set_position(pct as u64))
    };

    let mut client = FormClient::new(&args.endpoint).on_progress(observer);

    if let Some(path) = &args.fields_json {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let values: Map<String, Value> = serde_json::from_str(&raw)
            .with_context(|| format!("{} is not a JSON object", path.display()))?;

        client.record_mut().apply_json(&values)?;
    }

    for (name, value) in &args.fields {
        client.handle_change(name, value)?;
    }

    let attachments = [
        (Slot::Manifest, &args.manifest),
        (Slot::SamplingPermits, &args.sampling_permit),
        (Slot::NagoyaPermits, &args.nagoya_permit),
    ];

    for (slot, path) in attachments {
        if let Some(path) = path {
            client.handle_file_change(slot, Some(AttachedFile::from_path(path).await?));
        }
    }

    pb.set_message(format!("Sending to {}", args.endpoint));

    match client.submit().await {
        Ok(acknowledgement) => {
            pb.finish_with_message("Done");
            println!("{}", serde_json::to_string_pretty(&acknowledgement)?);

            Ok(())
        }
        Err(e) => {
            pb.abandon_with_message("Failed");

            Err(e.into())
        }
    }
}
