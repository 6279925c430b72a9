pub use snd_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Default config locations, searched in order.
const DEFAULT_PATHS: &[&str] = &[
    "./soundforged.toml",
    "~/.config/soundforged/config.toml",
    "/etc/soundforged/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config = Config::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("using config file {}", path.display());
            return load_config(path);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soundforged.toml");
        fs::write(
            &path,
            "[encode]\ncodecs = [\"mp3\"]\noutput_dir = \"/tmp/out\"\n",
        )
        .unwrap();

        let config = load_config_or_default(Some(&path)).unwrap();
        assert_eq!(config.encode.codecs, vec![snd_core::Codec::Mp3]);
        assert_eq!(config.encode.output_dir, Path::new("/tmp/out"));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_or_default(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn parse_error_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[encode\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
