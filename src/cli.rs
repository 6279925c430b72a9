use clap::{Parser, Subcommand};
use snd_core::{Bitrate, Codec};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soundforged")]
#[command(author, version, about = "Batch audio renditions, artist repair, and HLS test assets over ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode lossless sources into codec/bitrate renditions
    Encode {
        /// Source files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codecs to encode (comma-separated)
        #[arg(short = 'C', long, value_delimiter = ',')]
        codecs: Vec<Codec>,

        /// Bitrates to encode (comma-separated, e.g. 128k,256k)
        #[arg(short, long, value_delimiter = ',')]
        bitrates: Vec<Bitrate>,

        /// Number of parallel jobs (0 = number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Replace existing outputs
        #[arg(long)]
        overwrite: bool,

        /// Print the ffmpeg commands without running them
        #[arg(long)]
        dry_run: bool,

        /// Do not copy tags from the source
        #[arg(long)]
        strip_metadata: bool,
    },

    /// Recover artist tags from filenames for "Various Artists" files
    FixArtists {
        /// Audio files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Number of parallel jobs (0 = number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// List the planned changes without writing
        #[arg(long)]
        dry_run: bool,

        /// Separator between artist and title in filenames
        #[arg(long)]
        separator: Option<String>,

        /// Keep a copy of each original with this extension appended
        #[arg(long, num_args = 0..=1, default_missing_value = "bak")]
        backup: Option<String>,
    },

    /// Generate HLS fMP4 variants and master playlists
    Hls {
        /// Source files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Codecs to generate (comma-separated)
        #[arg(short = 'C', long, value_delimiter = ',')]
        codecs: Vec<Codec>,

        /// Bitrates to generate (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        bitrates: Vec<Bitrate>,

        /// Target segment duration in seconds
        #[arg(long)]
        segment_duration: Option<u32>,

        /// Number of parallel jobs (0 = number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Print the ffmpeg commands without running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe an audio file and display information
    Probe {
        /// File to probe (use --json for machine-readable output)
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
