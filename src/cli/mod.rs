use crate::config::Config;
use crate::core::{
    CandidateRecord, Downloader, ExtractError, ExtractionEngine, ExtractionEvent,
    ExtractionReport, StrategyKind,
};
use crate::utils::generate_output_filename;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "vidsniff")]
#[command(about = "Find the video sources embedded in a web page")]
#[command(version)]
pub struct Cli {
    /// Page to extract video sources from
    #[arg(value_name = "URL")]
    pub url: String,

    /// Download the best source after extraction
    #[arg(short, long)]
    pub download: bool,

    /// Output directory or file path for --download
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output filename template
    #[arg(short = 't', long, default_value = "%(title)s.%(ext)s")]
    pub output_template: String,

    /// Config file (defaults to ./vidsniff.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only run these strategies (repeatable)
    #[arg(short, long = "strategy", value_name = "NAME")]
    pub strategies: Vec<StrategyKind>,

    /// Also run the external extractor (yt-dlp)
    #[arg(long)]
    pub external: bool,

    /// Emit progress events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        let page_url = Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;
        let host = page_url.host_str().unwrap_or_default();
        if !config.is_domain_allowed(host) {
            bail!("Host '{}' is not in allowed_domains", host);
        }

        let engine = ExtractionEngine::with_config(config)?;
        info!("Strategies: {:?}", engine.strategy_kinds());

        self.emit(ExtractionEvent::started(&self.url))?;

        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_ctrl_c.cancel();
            }
        });

        let report = match engine.extract_with_cancel(&self.url, &cancel).await {
            Ok(report) => report,
            Err(ExtractError::Cancelled) => {
                self.emit(ExtractionEvent::error("Extraction cancelled"))?;
                bail!("Extraction cancelled");
            }
            Err(e) => {
                self.emit(ExtractionEvent::error(e.to_string()))?;
                return Err(e.into());
            }
        };

        if let Some(e) = &report.primary_fetch_error {
            warn!("Could not fetch page: {}", e);
        }

        if self.json {
            for event in ExtractionEvent::for_result(&report.candidates) {
                self.emit(event)?;
            }
        } else {
            print_report(&report);
        }

        if self.download {
            if let Some(best) = report.best() {
                self.download_best(&engine, best, &report.page_url).await?;
            }
        }

        Ok(())
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if !self.strategies.is_empty() {
            config.strategies = self.strategies.clone();
        }
        if self.external && !config.strategies.contains(&StrategyKind::ExternalExtractor) {
            config.strategies.push(StrategyKind::ExternalExtractor);
        }
        Ok(config)
    }

    fn emit(&self, event: ExtractionEvent) -> Result<()> {
        if self.json {
            println!("{}", event.to_json_line()?);
        }
        Ok(())
    }

    /// `--output` naming an existing directory or ending in a separator is a
    /// directory; anything else is the file to write.
    fn output_path(&self, config: &Config, best: &CandidateRecord) -> PathBuf {
        let filename = generate_output_filename(&self.output_template, &best.download_request());
        match &self.output {
            Some(path) if !is_directory_like(path) => path.clone(),
            Some(dir) => dir.join(filename),
            None => config.output_dir.join(filename),
        }
    }

    async fn download_best(
        &self,
        engine: &ExtractionEngine,
        best: &CandidateRecord,
        page_url: &Url,
    ) -> Result<()> {
        let output_path = self.output_path(engine.config(), best);
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }

        let downloader = Downloader::new(engine.config())?;
        let show_progress = !self.json;
        let written = downloader
            .download(&best.download_request(), page_url, &output_path, |done, total| {
                if show_progress {
                    print_progress(done, total);
                }
            })
            .await?;

        if show_progress {
            println!();
            println!("Saved {} ({} bytes)", output_path.display(), written);
        }
        Ok(())
    }
}

fn is_directory_like(path: &Path) -> bool {
    path.is_dir() || path.as_os_str().to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
}

fn print_report(report: &ExtractionReport) {
    if report.is_empty() {
        println!("No video sources found");
        return;
    }

    println!("Found {} video source(s):", report.candidates.len());
    for (i, candidate) in report.candidates.iter().enumerate() {
        let quality = if candidate.quality > 0 {
            format!("{}p", candidate.quality)
        } else {
            "unknown".to_string()
        };
        println!(
            "  {}: [{}] {} {} ({})",
            i + 1,
            quality,
            candidate.format,
            candidate.url,
            candidate.method
        );
    }
}

fn print_progress(done: u64, total: Option<u64>) {
    match total {
        Some(total) if total > 0 => {
            let percent = done as f64 / total as f64 * 100.0;
            print!("\rDownloaded {} / {} bytes ({:.1}%)", done, total, percent);
        }
        _ => print!("\rDownloaded {} bytes", done),
    }
    let _ = std::io::stdout().flush();
}
