//! HLS fMP4 test assets: one variant per rendition plus a master playlist
//! per source.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use snd_av::{
    generate_hls_rendition, hls_command, verify_hls_output, FfprobeProber, HlsOutput, HlsRequest,
    ToolRegistry,
};
use snd_core::config::{resolve_jobs, HlsConfig};
use snd_core::{Bitrate, Codec, Error, RenditionSpec, Result, SOURCE_EXTENSIONS};

use crate::discover::{discover_sources, probe_sources};
use crate::encode::ensure_encoders;
use crate::jobs::{plan_hls_jobs, HlsJob};
use crate::pool::{JobResult, WorkerPool};
use crate::report::{JobOutcome, Summary, ToOutcome};

/// Container overhead added to the nominal bitrate for `BANDWIDTH`.
const OVERHEAD_PERCENT: u64 = 10;

/// CD audio bit rate, used for lossless variants when the duration is unknown.
const FALLBACK_LOSSLESS_BPS: u64 = 1_411_200;

/// One `#EXT-X-STREAM-INF` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    /// Variant playlist URI, relative to the master playlist.
    pub uri: String,
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    pub average_bandwidth: u64,
    /// RFC 6381 codec string.
    pub codecs: String,
}

/// Master playlist listing the variants of one source.
#[derive(Debug, Clone, Default)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
}

impl MasterPlaylist {
    pub fn add_variant(&mut self, variant: Variant) -> &mut Self {
        self.variants.push(variant);
        self
    }

    /// Render to M3U8. Variants are listed by ascending bandwidth.
    pub fn render(&self) -> String {
        let mut variants: Vec<&Variant> = self.variants.iter().collect();
        variants.sort_by_key(|v| (v.bandwidth, v.uri.as_str()));

        let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-INDEPENDENT-SEGMENTS\n");
        for v in variants {
            out.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={},AVERAGE-BANDWIDTH={},CODECS=\"{}\"\n{}\n",
                v.bandwidth, v.average_bandwidth, v.codecs, v.uri
            ));
        }
        out
    }
}

/// `(BANDWIDTH, AVERAGE-BANDWIDTH)` for a finished variant.
///
/// Lossy variants use the nominal bitrate plus container overhead. Lossless
/// variants have no nominal rate, so the measured segment bytes over the
/// source duration are used for both.
pub fn variant_bandwidth(
    rendition: &RenditionSpec,
    output: &HlsOutput,
    duration: Option<Duration>,
) -> (u64, u64) {
    match rendition.bitrate {
        Some(bitrate) => {
            let nominal = bitrate.bits_per_second();
            (nominal + nominal * OVERHEAD_PERCENT / 100, nominal)
        }
        None => {
            let measured = duration
                .map(|d| d.as_secs_f64())
                .filter(|secs| *secs > 0.0)
                .map(|secs| (output.total_bytes as f64 * 8.0 / secs).ceil() as u64)
                .unwrap_or(FALLBACK_LOSSLESS_BPS);
            (measured, measured)
        }
    }
}

/// Settings for one HLS run.
#[derive(Debug, Clone)]
pub struct HlsOptions {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub codecs: Vec<Codec>,
    pub bitrates: Vec<Bitrate>,
    pub segment_duration: u32,
    pub jobs: usize,
    pub dry_run: bool,
    pub playlist_name: String,
    pub master_name: String,
}

impl HlsOptions {
    pub fn from_config(inputs: Vec<PathBuf>, config: &HlsConfig) -> Self {
        Self {
            inputs,
            output_dir: config.output_dir.clone(),
            codecs: config.codecs.clone(),
            bitrates: config.bitrates.clone(),
            segment_duration: config.segment_duration,
            jobs: config.jobs,
            dry_run: false,
            playlist_name: config.playlist_name.clone(),
            master_name: config.master_name.clone(),
        }
    }

    fn request(&self, job: &HlsJob) -> HlsRequest {
        HlsRequest {
            input: job.source.path.clone(),
            output_dir: job.output_dir.clone(),
            rendition: job.rendition,
            segment_duration: self.segment_duration,
            playlist_name: self.playlist_name.clone(),
        }
    }
}

/// Generate every variant of every source, then one master playlist per
/// source listing the variants that succeeded.
pub async fn run_hls(tools: &ToolRegistry, opts: &HlsOptions) -> Result<Summary> {
    if opts.segment_duration == 0 {
        return Err(Error::Validation("segment duration must be at least 1 second".into()));
    }
    let ffmpeg = tools.require("ffmpeg")?.clone();
    let prober = FfprobeProber::from_registry(tools)?;

    let sources = discover_sources(&opts.inputs, SOURCE_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::Validation("no source files found".to_string()));
    }

    let pool = WorkerPool::new(resolve_jobs(opts.jobs));
    let mut summary = Summary::new("hls");
    summary.dry_run = opts.dry_run;

    let probed = probe_sources(&pool, &prober, sources).await;
    for (source, err) in &probed.failed {
        tracing::warn!("skipping {}: {err}", source.path.display());
        summary.skip(format!("{}: {err}", source.display_name()));
    }
    let durations: BTreeMap<PathBuf, Option<Duration>> = probed
        .ok
        .iter()
        .map(|(source, info)| (source.path.clone(), info.duration))
        .collect();
    let sources: Vec<_> = probed.ok.into_iter().map(|(source, _)| source).collect();

    let plan = plan_hls_jobs(&sources, &opts.codecs, &opts.bitrates, &opts.output_dir)?;
    for skipped in &plan.skipped {
        tracing::warn!("skipping {skipped}");
        summary.skip(skipped.to_string());
    }
    ensure_encoders(tools, &plan.codecs()).await?;

    if opts.dry_run {
        for job in &plan.jobs {
            summary.plan(hls_command(&ffmpeg, &opts.request(job)).display());
        }
        summary.total = plan.jobs.len();
        return Ok(summary.finish());
    }

    tracing::info!(
        "generating {} HLS variants of {} sources with {} workers",
        plan.jobs.len(),
        sources.len(),
        pool.workers()
    );

    let jobs = plan.jobs.clone();
    let tools = Arc::new(tools.clone());
    let shared = Arc::new(opts.clone());
    let results = pool
        .run(plan.jobs, move |job| {
            let tools = Arc::clone(&tools);
            let opts = Arc::clone(&shared);
            async move { hls_job(&tools, &opts, &job).await }
        })
        .await;

    summary.add_results(&results);

    for (dir, master) in master_playlists(&jobs, &results, &durations) {
        let path = dir.join(&opts.master_name);
        if let Err(e) = tokio::fs::write(&path, master.render()).await {
            let err = Error::from(e);
            tracing::error!("failed to write {}: {err}", path.display());
            summary.fail(path.display().to_string(), &err);
            continue;
        }
        tracing::info!("wrote {} ({} variants)", path.display(), master.variants.len());
    }

    Ok(summary.finish())
}

impl ToOutcome for HlsOutput {
    fn to_outcome(&self) -> JobOutcome {
        JobOutcome::Completed {
            bytes: self.total_bytes,
        }
    }
}

async fn hls_job(tools: &ToolRegistry, opts: &HlsOptions, job: &HlsJob) -> Result<HlsOutput> {
    generate_hls_rendition(tools, &opts.request(job)).await?;
    verify_hls_output(&job.output_dir, &opts.playlist_name)
}

/// Group successful variants by source directory.
fn master_playlists(
    jobs: &[HlsJob],
    results: &[JobResult<HlsOutput>],
    durations: &BTreeMap<PathBuf, Option<Duration>>,
) -> BTreeMap<PathBuf, MasterPlaylist> {
    let mut masters: BTreeMap<PathBuf, MasterPlaylist> = BTreeMap::new();

    for (job, result) in jobs.iter().zip(results) {
        let Ok(output) = &result.outcome else {
            continue;
        };
        let Some(codecs) = job.rendition.codec.hls_codecs_tag() else {
            continue;
        };
        let duration = durations.get(&job.source.path).copied().flatten();
        let (bandwidth, average_bandwidth) = variant_bandwidth(&job.rendition, output, duration);
        let uri = format!("{}/{}", job.rendition.label(), output_file_name(output));

        masters
            .entry(job.source_dir().to_path_buf())
            .or_default()
            .add_variant(Variant {
                uri,
                bandwidth,
                average_bandwidth,
                codecs: codecs.to_string(),
            });
    }

    masters
}

fn output_file_name(output: &HlsOutput) -> String {
    output
        .playlist
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "index.m3u8".to_string())
}
