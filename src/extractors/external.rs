use crate::core::candidate::quality_from_json;
use crate::core::fetcher::FetchedPage;
use crate::core::validator::{is_valid_candidate_with, ValidationRules};
use crate::core::{
    CandidateRecord, ContainerFormat, ExtractionContext, ExtractionMethod, Strategy,
    StrategyError, StrategyKind,
};
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Hands the page URL to a yt-dlp compatible binary and maps the formats it
/// reports. Off unless `external_extractor` is enabled in the strategy list.
pub struct ExternalExtractorStrategy;

impl ExternalExtractorStrategy {
    async fn dump_info(&self, ctx: &ExtractionContext) -> Result<Value, StrategyError> {
        let config = ctx.config();
        let page_url = ctx.page_url().as_str();

        let child = Command::new(&config.external_extractor)
            .args([
                "--dump-single-json",
                "--no-warnings",
                "--no-playlist",
                "--skip-download",
                "--user-agent",
                config.user_agent.as_str(),
                "--referer",
                page_url,
                page_url,
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        debug!("Spawned {} for {}", config.external_extractor.display(), page_url);

        let timeout = config.external_timeout();
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| StrategyError::External(format!("timed out after {:?}", timeout)))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StrategyError::External(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| StrategyError::External(format!("invalid JSON output: {}", e)))
    }
}

#[async_trait]
impl Strategy for ExternalExtractorStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExternalExtractor
    }

    async fn discover(
        &self,
        _page: &FetchedPage,
        ctx: &ExtractionContext,
    ) -> Result<Vec<CandidateRecord>, StrategyError> {
        let info = self.dump_info(ctx).await?;
        let rules = ValidationRules::permissive(ctx.config().min_url_length);
        let records = records_from_info(&info, &rules);
        info!("External extractor reported {} format(s)", records.len());
        Ok(records)
    }
}

/// Map a `--dump-single-json` document to candidate records. Every format
/// that carries a URL and video is kept; a document without usable formats
/// falls back to its top-level `url`.
pub fn records_from_info(info: &Value, rules: &ValidationRules) -> Vec<CandidateRecord> {
    let formats = info
        .get("formats")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let records: Vec<_> = formats
        .iter()
        .filter(|format| str_field(format, "vcodec") != Some("none"))
        .filter_map(|format| record_from_format(format, info, rules))
        .collect();

    if !records.is_empty() {
        return records;
    }

    record_from_format(info, info, rules).into_iter().collect()
}

fn record_from_format(
    format: &Value,
    info: &Value,
    rules: &ValidationRules,
) -> Option<CandidateRecord> {
    let url = str_field(format, "url")?;
    if !is_valid_candidate_with(url, rules) {
        debug!("Rejected external format {}", url);
        return None;
    }

    let mut record = CandidateRecord::from_url(url, ExtractionMethod::External);

    let height = format.get("height").map(quality_from_json).unwrap_or(0);
    if height > 0 {
        record.quality = height;
    }

    let container = container_for(format);
    if container != ContainerFormat::Unknown {
        record.format = container;
    }

    if let Some(title) = str_field(info, "title").filter(|t| !t.trim().is_empty()) {
        record.title = title.to_string();
    }
    record.uploader = str_field(info, "uploader").map(str::to_string);
    record.duration = info.get("duration").and_then(Value::as_f64);
    record.fps = format.get("fps").and_then(Value::as_f64);
    record.vcodec = codec_field(format, "vcodec");
    record.acodec = codec_field(format, "acodec");
    record.filesize = format
        .get("filesize")
        .and_then(Value::as_u64)
        .or_else(|| format.get("filesize_approx").and_then(Value::as_u64));

    Some(record)
}

fn container_for(format: &Value) -> ContainerFormat {
    let protocol = str_field(format, "protocol").unwrap_or_default();
    if protocol.starts_with("m3u8") {
        return ContainerFormat::Hls;
    }
    if protocol.contains("dash") {
        return ContainerFormat::Dash;
    }
    str_field(format, "ext")
        .map(ContainerFormat::from_extension)
        .unwrap_or_default()
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn codec_field(format: &Value, key: &str) -> Option<String> {
    str_field(format, key)
        .filter(|codec| *codec != "none")
        .map(str::to_string)
}
