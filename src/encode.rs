//! Rendition encoding: every lossless source × codec × bitrate.

use std::path::PathBuf;
use std::sync::Arc;

use snd_av::{encode_command, encode_rendition, verify_output, EncodeRequest, FfprobeProber, ToolRegistry};
use snd_core::config::{resolve_jobs, EncodeConfig};
use snd_core::{Bitrate, Codec, Error, Result, SOURCE_EXTENSIONS};

use crate::discover::{discover_sources, probe_sources};
use crate::jobs::{plan_encode_jobs, EncodeJob};
use crate::pool::WorkerPool;
use crate::report::{JobOutcome, Summary};

/// Settings for one encode run, after CLI flags are merged over config.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub codecs: Vec<Codec>,
    pub bitrates: Vec<Bitrate>,
    pub jobs: usize,
    pub overwrite: bool,
    pub dry_run: bool,
    pub preserve_metadata: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
    pub min_output_bytes: u64,
}

impl EncodeOptions {
    pub fn from_config(inputs: Vec<PathBuf>, config: &EncodeConfig) -> Self {
        Self {
            inputs,
            output_dir: config.output_dir.clone(),
            codecs: config.codecs.clone(),
            bitrates: config.bitrates.clone(),
            jobs: config.jobs,
            overwrite: config.overwrite,
            dry_run: false,
            preserve_metadata: config.preserve_metadata,
            sample_rate: config.sample_rate,
            channels: config.channels,
            min_output_bytes: config.min_output_bytes,
        }
    }

    fn request(&self, job: &EncodeJob) -> EncodeRequest {
        EncodeRequest {
            input: job.source.path.clone(),
            output: job.output.clone(),
            rendition: job.rendition,
            overwrite: self.overwrite,
            preserve_metadata: self.preserve_metadata,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Fail with [`Error::Tool`] if any codec's encoder is missing from this
/// ffmpeg build.
pub async fn ensure_encoders(tools: &ToolRegistry, codecs: &[Codec]) -> Result<()> {
    let available = tools.audio_encoders().await?;
    let missing: Vec<String> = codecs
        .iter()
        .filter(|c| !available.contains(c.encoder()))
        .map(|c| format!("{} ({c})", c.encoder()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::tool(
            "ffmpeg",
            format!("encoder not available in this build: {}", missing.join(", ")),
        ))
    }
}

/// Encode every lossless source found under `opts.inputs`.
pub async fn run_encode(tools: &ToolRegistry, opts: &EncodeOptions) -> Result<Summary> {
    let ffmpeg = tools.require("ffmpeg")?.clone();
    let prober = FfprobeProber::from_registry(tools)?;

    let sources = discover_sources(&opts.inputs, SOURCE_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::Validation("no lossless source files found".to_string()));
    }

    let pool = WorkerPool::new(resolve_jobs(opts.jobs));
    let mut summary = Summary::new("encode");
    summary.dry_run = opts.dry_run;

    tracing::info!("probing {} source files", sources.len());
    let probed = probe_sources(&pool, &prober, sources).await;
    for (source, err) in &probed.failed {
        tracing::warn!("skipping {}: {err}", source.path.display());
        summary.skip(format!("{}: {err}", source.display_name()));
    }

    let mut lossless = Vec::with_capacity(probed.ok.len());
    for (source, info) in probed.ok {
        if info.is_lossless() {
            lossless.push(source);
        } else {
            let codec = info
                .primary_audio()
                .map(|s| s.codec_name.as_str())
                .unwrap_or("unknown");
            tracing::warn!("skipping {}: {codec} is not a lossless codec", source.path.display());
            summary.skip(format!("{}: not lossless ({codec})", source.display_name()));
        }
    }

    let plan = plan_encode_jobs(&lossless, &opts.codecs, &opts.bitrates, &opts.output_dir)?;
    for skipped in &plan.skipped {
        tracing::warn!("skipping {skipped}");
        summary.skip(skipped.to_string());
    }
    ensure_encoders(tools, &plan.codecs()).await?;

    if opts.dry_run {
        for job in &plan.jobs {
            summary.plan(encode_command(&ffmpeg, &opts.request(job)).display());
        }
        summary.total = plan.jobs.len();
        return Ok(summary.finish());
    }

    tracing::info!(
        "encoding {} renditions of {} sources with {} workers",
        plan.jobs.len(),
        lossless.len(),
        pool.workers()
    );

    let tools = Arc::new(tools.clone());
    let opts = Arc::new(opts.clone());
    let results = pool
        .run(plan.jobs, move |job| {
            let tools = Arc::clone(&tools);
            let opts = Arc::clone(&opts);
            async move { encode_job(&tools, &opts, &job).await }
        })
        .await;

    summary.add_results(&results);
    Ok(summary.finish())
}

async fn encode_job(tools: &ToolRegistry, opts: &EncodeOptions, job: &EncodeJob) -> Result<JobOutcome> {
    if !opts.overwrite && job.output.exists() {
        return Ok(JobOutcome::Skipped {
            reason: format!("{} already exists", job.output.display()),
        });
    }

    let checked = match encode_rendition(tools, &opts.request(job)).await {
        Ok(()) => verify_output(&job.output, opts.min_output_bytes),
        Err(e) => Err(e),
    };

    match checked {
        Ok(bytes) => Ok(JobOutcome::Completed { bytes }),
        Err(e) => {
            if job.output.exists() {
                if let Err(rm) = tokio::fs::remove_file(&job.output).await {
                    tracing::warn!("could not remove bad output {}: {rm}", job.output.display());
                }
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::SourceFile;
    use snd_core::RenditionSpec;
    use std::time::Duration;

    fn options(dir: &std::path::Path) -> EncodeOptions {
        let mut opts = EncodeOptions::from_config(vec![dir.to_path_buf()], &EncodeConfig::default());
        opts.output_dir = dir.join("out");
        opts
    }

    fn job(dir: &std::path::Path) -> EncodeJob {
        EncodeJob {
            id: 1,
            source: SourceFile {
                path: dir.join("a.flac"),
                root: dir.to_path_buf(),
            },
            rendition: RenditionSpec::lossy(Codec::Mp3, Bitrate::from_kbps(128).unwrap()),
            output: dir.join("out/mp3_128k/a.mp3"),
        }
    }

    #[test]
    fn options_follow_config() {
        let config = EncodeConfig {
            overwrite: true,
            sample_rate: Some(44_100),
            ..EncodeConfig::default()
        };
        let opts = EncodeOptions::from_config(vec![PathBuf::from("/music")], &config);
        assert!(opts.overwrite);
        assert_eq!(opts.codecs, config.codecs);
        assert!(!opts.dry_run);

        let dir = tempfile::tempdir().unwrap();
        let req = opts.request(&job(dir.path()));
        assert_eq!(req.sample_rate, Some(44_100));
        assert!(req.overwrite);
    }

    #[tokio::test]
    async fn existing_output_is_skipped_without_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir_all(job.output.parent().unwrap()).unwrap();
        std::fs::write(&job.output, b"previous").unwrap();

        // No ffmpeg registered: reaching the encoder would be an error.
        let tools = ToolRegistry::from_tools(Vec::new());
        let outcome = encode_job(&tools, &options(dir.path()), &job).await.unwrap();
        assert!(matches!(outcome, JobOutcome::Skipped { .. }));
        assert_eq!(std::fs::read(&job.output).unwrap(), b"previous");
    }

    #[tokio::test]
    async fn failed_encode_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        std::fs::create_dir_all(job.output.parent().unwrap()).unwrap();
        std::fs::write(&job.output, b"partial").unwrap();

        let tools = ToolRegistry::from_tools([snd_av::ToolConfig {
            name: "ffmpeg".into(),
            path: PathBuf::from("false"),
            timeout: Duration::from_secs(5),
        }]);
        let mut opts = options(dir.path());
        opts.overwrite = true;

        let err = encode_job(&tools, &opts, &job).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
        assert!(!job.output.exists());
    }

    #[tokio::test]
    async fn undersized_output_fails_verification() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());

        // `true` exits 0 without writing anything.
        let tools = ToolRegistry::from_tools([snd_av::ToolConfig {
            name: "ffmpeg".into(),
            path: PathBuf::from("true"),
            timeout: Duration::from_secs(5),
        }]);

        let err = encode_job(&tools, &options(dir.path()), &job).await.unwrap_err();
        assert!(matches!(err, Error::Job { .. }));
    }
}
