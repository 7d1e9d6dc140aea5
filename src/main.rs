use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flyer_layers::config::{
    BackgroundSpec, EnhancementSettings, ExportSettings, GatewayConfig, OutputFormat,
    ResolutionTier,
};
use flyer_layers::core::{LayerKind, LayerMap, UploadedFile, VisibilityMask};
use flyer_layers::processing::{Download, composite};
use flyer_layers::session::{SeparationReport, Studio};
use flyer_layers::{Artifact, FlyerError, GeminiGateway, HasUserMessage, MediaType};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Split a flyer into background, person and text layers, rework them and
/// export an upscaled result.
#[derive(Parser, Debug)]
#[command(name = "flyer")]
#[command(about = "🖼️  Rebuild flyers layer by layer with a generative image service")]
#[command(long_about = "Rebuild flyers layer by layer with a generative image service.
Every command except `compose` talks to the image service; configure it with
FLYER_API_KEY (or API_KEY) and the gateway flags below.")]
struct Cli {
    #[command(flatten)]
    gateway: GatewayArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GatewayArgs {
    /// Base URL of the image service
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Model name used for every transform
    #[arg(long = "gateway-model", global = true)]
    model: Option<String>,

    /// API key (prefer FLYER_API_KEY so it stays out of shell history)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Maximum requests in flight at once
    #[arg(long, global = true)]
    max_concurrent: Option<usize>,
}

impl GatewayArgs {
    fn apply(self, mut config: GatewayConfig) -> GatewayConfig {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = endpoint;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(api_key) = self.api_key {
            config.api_key = Some(api_key);
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(max) = self.max_concurrent {
            config.max_concurrent_requests = max;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a flyer and write its three layers
    Separate {
        /// JPG or PNG flyer, at most 5MB
        input: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Generate a new flyer from a description and write its layers
    Create {
        prompt: String,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Restore a flyer's quality, then separate the restored image
    Restore {
        input: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Separate a flyer and re-render one of its layers
    Enhance {
        input: PathBuf,
        /// background, person or text
        #[arg(short, long)]
        layer: LayerKind,
        #[arg(long, default_value = "Classic")]
        model: String,
        #[arg(long, default_value = "2k")]
        resolution: String,
        #[arg(long, default_value = "Estándar")]
        style: String,
        #[arg(long, default_value = "Nada")]
        creativity: String,
        /// Free-text instruction for the enhancement
        #[arg(short, long)]
        prompt: Option<String>,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Separate a flyer, recomposite it and export an upscaled image
    Export {
        input: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(long, default_value_t = ResolutionTier::default())]
        resolution: ResolutionTier,
        #[arg(long, default_value_t = OutputFormat::default())]
        format: OutputFormat,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Composite existing `<kind>-layer.png` files without any remote call
    Compose {
        /// Directory holding background-layer.png, person-layer.png, text-layer.png
        #[arg(long, default_value = ".")]
        layers_dir: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[command(flatten)]
        output: OutputArgs,
        #[arg(short = 'O', long, default_value = "flyer-composite.png")]
        output_file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// transparent, white, black or #rrggbb
    #[arg(short, long, default_value_t = BackgroundSpec::default())]
    background: BackgroundSpec,

    /// Layers to leave out of the composite (repeatable)
    #[arg(long)]
    hide: Vec<LayerKind>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flyer_layers=info,flyer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<FlyerError>() {
                Some(flyer) => eprintln!("Error: {}", flyer.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let gateway = cli.gateway;
    match cli.command {
        Command::Compose {
            layers_dir,
            width,
            height,
            output,
            output_file,
        } => compose_offline(&layers_dir, width, height, &output, &output_file).await,
        Command::Separate { input, out_dir } => {
            let studio = connect(gateway)?;
            let report = studio.upload(&UploadedFile::read(&input).await?).await?;
            summarize(&report);
            write_layers(&studio, &out_dir).await
        }
        Command::Create { prompt, out_dir } => {
            let studio = connect(gateway)?;
            let report = studio.create_from_prompt(&prompt).await?;
            summarize(&report);
            write_layers(&studio, &out_dir).await
        }
        Command::Restore { input, out_dir } => {
            let studio = connect(gateway)?;
            studio.upload(&UploadedFile::read(&input).await?).await?;
            let report = studio.restore_quality().await?;
            summarize(&report);
            if let Some(source) = studio.source() {
                let restored = Download {
                    filename: format!("restored.{}", source.artifact.media_type().extension()),
                    artifact: source.artifact,
                };
                write_download(&out_dir, &restored).await?;
            }
            write_layers(&studio, &out_dir).await
        }
        Command::Enhance {
            input,
            layer,
            model,
            resolution,
            style,
            creativity,
            prompt,
            out_dir,
        } => {
            let studio = connect(gateway)?;
            let report = studio.upload(&UploadedFile::read(&input).await?).await?;
            summarize(&report);
            let settings = EnhancementSettings {
                model,
                resolution,
                style,
                creativity,
                prompt,
            };
            studio.enhance_layer(layer, &settings).await?;
            info!(layer = %layer, "layer enhanced");
            write_layers(&studio, &out_dir).await
        }
        Command::Export {
            input,
            output,
            resolution,
            format,
            out_dir,
        } => {
            let studio = connect(gateway)?;
            let report = studio.upload(&UploadedFile::read(&input).await?).await?;
            summarize(&report);
            for kind in &output.hide {
                if studio.is_visible(*kind) {
                    studio.toggle_visibility(*kind);
                }
            }
            let settings = ExportSettings {
                format,
                resolution,
                background: output.background,
            };
            let download = studio.export(&settings).await?;
            write_download(&out_dir, &download).await.map(|_| ())
        }
    }
}

fn connect(args: GatewayArgs) -> Result<Studio> {
    let config = args.apply(GatewayConfig::from_env()?);
    let gateway = GeminiGateway::new(config)?;
    Ok(Studio::builder().with_gateway(Arc::new(gateway)).build()?)
}

fn summarize(report: &SeparationReport) {
    for (kind, reason) in report.failed() {
        warn!(layer = %kind, %reason, "layer could not be extracted");
    }
    println!(
        "Extracted {} of 3 layers: {:?}",
        report.extracted().len(),
        report.extracted()
    );
}

async fn write_layers(studio: &Studio, out_dir: &Path) -> Result<()> {
    for kind in LayerKind::STACKING_ORDER {
        if let Some(download) = studio.download_layer(kind)? {
            write_download(out_dir, &download).await?;
        }
    }
    Ok(())
}

async fn write_download(out_dir: &Path, download: &Download) -> Result<PathBuf> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let path = out_dir.join(&download.filename);
    tokio::fs::write(&path, download.artifact.bytes())
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(path)
}

async fn compose_offline(
    layers_dir: &Path,
    width: u32,
    height: u32,
    output: &OutputArgs,
    output_file: &Path,
) -> Result<()> {
    let mut layers = LayerMap::<Option<Artifact>>::default();
    for kind in LayerKind::STACKING_ORDER {
        let path = layers_dir.join(kind.download_filename());
        match tokio::fs::read(&path).await {
            Ok(bytes) => *layers.get_mut(kind) = Some(Artifact::new(MediaType::Png, bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(layer = %kind, path = %path.display(), "layer file not found, skipping");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        }
    }

    let mut mask = VisibilityMask::default();
    for kind in &output.hide {
        mask.set(*kind, false);
    }

    let flat = composite(&layers, &mask, width, height, output.background)?;
    tokio::fs::write(output_file, flat.artifact.bytes())
        .await
        .with_context(|| format!("writing {}", output_file.display()))?;
    println!(
        "Composited {:?} into {} ({}x{})",
        flat.drawn,
        output_file.display(),
        flat.width,
        flat.height
    );
    Ok(())
}
