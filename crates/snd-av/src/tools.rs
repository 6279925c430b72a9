//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of `ffmpeg` and
//! `ffprobe` and provides lookup methods for the rest of the crate.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::ToolCommand;

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

/// Configuration for a single external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Human-readable tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
    /// Maximum execution time before the tool is killed.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
}

impl ToolConfig {
    /// Start a [`ToolCommand`] for this tool with its timeout applied.
    pub fn command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.path.clone());
        cmd.timeout(self.timeout);
        cmd
    }
}

/// Serde helpers to (de)serialize `Duration` as whole seconds.
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`snd_core::config::ToolsConfig`] supplies
    /// a custom path **and** that path exists, it is used directly.
    /// Otherwise [`which::which`] is used to locate the tool in `PATH`.
    /// Tools that are not found are omitted from the registry.
    pub fn discover(tools_config: &snd_core::config::ToolsConfig) -> Self {
        let timeout = Duration::from_secs(tools_config.timeout_secs);
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "configured {name} path {} does not exist; searching PATH",
                        p.display()
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!("found {name} at {}", path.display());
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                        timeout,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit tool configs, bypassing discovery.
    pub fn from_tools(configs: impl IntoIterator<Item = ToolConfig>) -> Self {
        Self {
            tools: configs.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or an
    /// [`snd_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> snd_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            snd_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| match self.tools.get(name) {
                Some(cfg) => ToolInfo {
                    name: name.to_string(),
                    available: true,
                    version: detect_version(&cfg.path),
                    path: Some(cfg.path.clone()),
                },
                None => ToolInfo {
                    name: name.to_string(),
                    available: false,
                    version: None,
                    path: None,
                },
            })
            .collect()
    }

    /// List the audio encoders compiled into the discovered ffmpeg.
    pub async fn audio_encoders(&self) -> snd_core::Result<BTreeSet<String>> {
        let ffmpeg = self.require("ffmpeg")?;
        let mut cmd = ffmpeg.command();
        cmd.args(["-hide_banner", "-encoders"]);
        let output = cmd.execute().await?;
        Ok(parse_audio_encoders(&output.stdout))
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

/// Parse `ffmpeg -encoders` output. Encoder lines look like
/// ` A....D libopus              libopus Opus`; the first flag column is
/// `A` for audio encoders. The legend above the `------` rule is skipped.
fn parse_audio_encoders(stdout: &str) -> BTreeSet<String> {
    stdout
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("---"))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let name = parts.next()?;
            flags.starts_with('A').then(|| name.to_string())
        })
        .collect()
}
