mod cli;

use soundforged::{
    artists::{run_fix_artists, ArtistOptions},
    config,
    encode::{run_encode, EncodeOptions},
    hls::{run_hls, HlsOptions},
    report::{format_bytes, Summary},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use snd_av::{FfprobeProber, ToolRegistry};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "soundforged=debug,snd_av=debug,snd_core=debug".to_string()
        } else {
            "soundforged=info,snd_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit status for a failed run: the code of the first [`snd_core::Error`]
/// in the chain, or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<snd_core::Error>())
        .map(|e| e.exit_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Encode {
            inputs,
            output,
            codecs,
            bitrates,
            jobs,
            overwrite,
            dry_run,
            strip_metadata,
        } => {
            let config = config::load_config_or_default(config_path)?;
            let mut opts = EncodeOptions::from_config(inputs, &config.encode);
            if let Some(output) = output {
                opts.output_dir = output;
            }
            if !codecs.is_empty() {
                opts.codecs = codecs;
            }
            if !bitrates.is_empty() {
                opts.bitrates = bitrates;
            }
            if let Some(jobs) = jobs {
                opts.jobs = jobs;
            }
            opts.overwrite |= overwrite;
            opts.dry_run = dry_run;
            if strip_metadata {
                opts.preserve_metadata = false;
            }

            let tools = ToolRegistry::discover(&config.tools);
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt
                .block_on(run_encode(&tools, &opts))
                .context("encode failed")?;
            finish(&summary, json)
        }
        Commands::FixArtists {
            inputs,
            jobs,
            dry_run,
            separator,
            backup,
        } => {
            let config = config::load_config_or_default(config_path)?;
            let mut artists = config.artists.clone();
            if let Some(separator) = separator {
                artists.separator = separator;
            }
            if let Some(jobs) = jobs {
                artists.jobs = jobs;
            }
            let opts = ArtistOptions {
                inputs,
                config: artists,
                dry_run,
                backup,
            };

            let tools = ToolRegistry::discover(&config.tools);
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt
                .block_on(run_fix_artists(&tools, &opts))
                .context("fix-artists failed")?;
            finish(&summary, json)
        }
        Commands::Hls {
            inputs,
            output,
            codecs,
            bitrates,
            segment_duration,
            jobs,
            dry_run,
        } => {
            let config = config::load_config_or_default(config_path)?;
            let mut opts = HlsOptions::from_config(inputs, &config.hls);
            if let Some(output) = output {
                opts.output_dir = output;
            }
            if !codecs.is_empty() {
                opts.codecs = codecs;
            }
            if !bitrates.is_empty() {
                opts.bitrates = bitrates;
            }
            if let Some(secs) = segment_duration {
                opts.segment_duration = secs;
            }
            if let Some(jobs) = jobs {
                opts.jobs = jobs;
            }
            opts.dry_run = dry_run;

            let tools = ToolRegistry::discover(&config.tools);
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt.block_on(run_hls(&tools, &opts)).context("hls failed")?;
            finish(&summary, json)
        }
        Commands::Probe { file } => probe_file(&file, config_path, json),
        Commands::CheckTools => check_tools(config_path, json),
        Commands::Validate {
            config: validate_path,
        } => {
            validate_config(validate_path.as_deref().or(config_path))
        }
        Commands::Version => {
            println!("soundforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Print the summary and turn job failures into a non-zero exit.
fn finish(summary: &Summary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        print!("{}", summary.render());
    }

    match summary.failure_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        return Err(snd_core::Error::Validation(format!(
            "file does not exist: {}",
            file.display()
        ))
        .into());
    }

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::from_registry(&tools)?;
    let rt = tokio::runtime::Runtime::new()?;
    let info = rt.block_on(prober.probe(file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File: {}", info.path.display());
    println!("Format: {}", info.format_name);
    println!("Size: {} ({} bytes)", format_bytes(info.size), info.size);
    if let Some(duration) = info.duration {
        let secs = duration.as_secs();
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
    }
    if let Some(bit_rate) = info.bit_rate {
        println!("Bit rate: {} kb/s", bit_rate / 1000);
    }
    println!("Lossless: {}", if info.is_lossless() { "yes" } else { "no" });

    println!("\nAudio Streams: {}", info.streams.len());
    for stream in &info.streams {
        print!("  [{}] {}", stream.index, stream.codec_name);
        if let Some(rate) = stream.sample_rate {
            print!(" {rate} Hz");
        }
        if let Some(ch) = stream.channels {
            print!(" {ch}ch");
        }
        if let Some(bits) = stream.bits_per_sample {
            print!(" {bits} bit");
        }
        println!();
    }

    if !info.tags.is_empty() {
        println!("\nTags:");
        for (key, value) in info.tags.iter() {
            println!("  {key}: {value}");
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let registry = ToolRegistry::discover(&config.tools);
    let tools = registry.check_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("Checking external tools...\n");
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    if registry.require("ffmpeg").is_ok() {
        let rt = tokio::runtime::Runtime::new()?;
        match rt.block_on(registry.audio_encoders()) {
            Ok(encoders) => {
                println!("\nEncoders:");
                for codec in snd_core::Codec::ALL {
                    let mark = if encoders.contains(codec.encoder()) {
                        "✓"
                    } else {
                        all_ok = false;
                        "✗"
                    };
                    println!("{mark} {codec} ({})", codec.encoder());
                }
            }
            Err(e) => tracing::warn!("could not list ffmpeg encoders: {e}"),
        }
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        println!("Configuration loaded with {} warning(s):", warnings.len());
        for warning in &warnings {
            println!("  ! {warning}");
        }
    }

    let join = |items: Vec<String>| items.join(", ");
    println!(
        "  Encode: {} [{}] at [{}]",
        config.encode.output_dir.display(),
        join(config.encode.codecs.iter().map(|c| c.to_string()).collect()),
        join(config.encode.bitrates.iter().map(|b| b.to_string()).collect()),
    );
    println!(
        "  HLS: {} [{}] at [{}], {}s segments",
        config.hls.output_dir.display(),
        join(config.hls.codecs.iter().map(|c| c.to_string()).collect()),
        join(config.hls.bitrates.iter().map(|b| b.to_string()).collect()),
        config.hls.segment_duration,
    );
    println!(
        "  Artists: separator {:?}, placeholders [{}]",
        config.artists.separator,
        config.artists.various_names.join(", "),
    );

    Ok(())
}
