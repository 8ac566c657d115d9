use crate::{
    config::Config,
    document::{Docx, DocumentBody},
    pipeline::Pipeline,
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "resume-inserter")]
#[command(about = "Rename candidate certificate images and insert them into a resume .docx")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./resume-inserter.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how each candidate folder would be renamed, without touching it.
    Plan {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the document's paragraph texts with their indices.
    Paragraphs {
        #[arg(long)]
        document: Option<PathBuf>,
    },
    /// Rename images and write the document with the images inserted.
    Run {
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        document: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let _guard = init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::Plan { root } => plan(&cfg, &pick(root, &cfg.paths.root_folder)),
        Command::Paragraphs { document } => {
            paragraphs(&pick(document, &cfg.paths.input_document))
        }
        Command::Run {
            root,
            document,
            output,
        } => run(
            &cfg,
            &pick(root, &cfg.paths.root_folder),
            &pick(document, &cfg.paths.input_document),
            &pick(output, &cfg.paths.output_document),
        ),
    }
}

fn pick(flag: &Option<PathBuf>, configured: &str) -> PathBuf {
    flag.clone().unwrap_or_else(|| PathBuf::from(configured))
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("resume-inserter.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .boxed()
    };

    let (file_layer, guard) = match resolve_log_path(cfg) {
        Some(path) => {
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
            let file = std::fs::File::create(&path)
                .with_context(|| format!("create log file: {}", path.display()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("resume-inserter.log"))
}

fn plan(cfg: &Config, root: &Path) -> Result<()> {
    let pipeline = Pipeline::new(cfg)?;
    let entries = pipeline.plan(root)?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn paragraphs(document: &Path) -> Result<()> {
    let doc = Docx::open(document)?;
    let listing: Vec<_> = (0..doc.paragraph_count())
        .map(|i| {
            serde_json::json!({
                "index": i,
                "text": doc.paragraph_text(i).unwrap_or_default(),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&listing)?);
    Ok(())
}

fn run(cfg: &Config, root: &Path, document: &Path, output: &Path) -> Result<()> {
    info!(
        "root={} document={} output={}",
        root.display(),
        document.display(),
        output.display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        info!("effective config:\n{raw}");
    }

    let pipeline = Pipeline::new(cfg)?;
    let report = pipeline.run(root, document, output)?;

    if cfg.output.write_report_json {
        std::fs::write(
            &cfg.output.report_filename,
            serde_json::to_string_pretty(&report)?,
        )
        .with_context(|| format!("writing report: {}", cfg.output.report_filename))?;
    }

    if cfg.output.print_summary {
        let inserted: usize = report
            .candidates
            .iter()
            .flat_map(|c| &c.anchors)
            .map(|a| a.inserted.len())
            .sum();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "output": report.output,
                "candidates": report.candidates.len(),
                "skipped": report.skipped.len(),
                "images_inserted": inserted,
                "status": "ok"
            }))?
        );
    }

    Ok(())
}
