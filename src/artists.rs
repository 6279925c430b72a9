//! Repair files tagged with a "Various Artists" placeholder by recovering
//! the real artist from the filename (`01 - Artist - Title.flac`).

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use snd_av::{retag_artist, verify_output, AudioInfo, FfprobeProber, RetagRequest, ToolRegistry, Workspace};
use snd_core::config::{resolve_jobs, ArtistsConfig};
use snd_core::{Error, Result, AUDIO_EXTENSIONS};

use crate::discover::{discover_sources, probe_sources, SourceFile};
use crate::pool::{PoolJob, WorkerPool};
use crate::report::{JobOutcome, Summary};

/// Leading track tokens: `01 - `, `01. `, `3) `, `07_`, `A1 `, `1-03 `, `07 `.
/// A bare number needs a leading zero, a disc prefix, or a vinyl side so
/// that names like `50 Cent` survive.
static TRACK_PREFIX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[A-Da-d]?\d{1,3}(?:[-.]\d{1,3})?\s*(?:[.\-)]\s+|_\s*)|(?:0\d{1,2}|\d{1,2}-\d{1,3}|[A-Da-d]\d{1,2})\s+)",
    )
    .ok()
});

/// Case-insensitive, whitespace-trimmed match against the placeholder names.
pub fn is_various(artist: &str, names: &[String]) -> bool {
    let artist = artist.trim();
    names.iter().any(|n| n.trim().eq_ignore_ascii_case(artist))
}

/// Artist and title recovered from a filename stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub artist: String,
    pub title: String,
    pub track: Option<String>,
}

/// Split `stem` into artist and title.
///
/// Returns `None` when the separator is absent, either half is empty, or
/// the artist half is itself a placeholder name.
pub fn parse_filename(stem: &str, config: &ArtistsConfig) -> Option<ParsedName> {
    let mut rest = stem.trim();
    let mut track = None;

    if config.strip_track_numbers {
        if let Some(m) = TRACK_PREFIX.as_ref().and_then(|re| re.find(rest)) {
            let token = m
                .as_str()
                .trim_end_matches(|c: char| c.is_whitespace() || ".-_)".contains(c));
            track = Some(token.to_string());
            rest = &rest[m.end()..];
        }
    }

    if config.separator.is_empty() {
        return None;
    }
    let (artist, title) = rest.split_once(config.separator.as_str())?;
    let (artist, title) = (artist.trim(), title.trim());
    if artist.is_empty() || title.is_empty() || is_various(artist, &config.various_names) {
        return None;
    }

    Some(ParsedName {
        artist: artist.to_string(),
        title: title.to_string(),
        track,
    })
}

/// One planned retag.
#[derive(Debug, Clone)]
pub struct ArtistFix {
    pub source: SourceFile,
    /// The placeholder value currently in the file.
    pub current: String,
    pub artist: String,
    /// Title to write, when the file has none (or only the filename).
    pub title: Option<String>,
}

impl PoolJob for ArtistFix {
    fn label(&self) -> String {
        format!("{} -> {}", self.source.display_name(), self.artist)
    }
}

impl ArtistFix {
    fn describe(&self) -> String {
        let mut line = format!(
            "{}: artist {:?} -> {:?}",
            self.source.path.display(),
            self.current,
            self.artist
        );
        if let Some(ref title) = self.title {
            line.push_str(&format!(", title -> {title:?}"));
        }
        line
    }
}

/// The outcome of planning: fixes to apply, files whose names could not be
/// parsed, and a count of files that were already fine.
#[derive(Debug, Default)]
pub struct FixPlan {
    pub fixes: Vec<ArtistFix>,
    pub unparseable: Vec<SourceFile>,
    pub untouched: usize,
}

/// The placeholder value a file is tagged with, if any. An empty artist with
/// a placeholder album artist also counts.
fn placeholder<'a>(info: &'a AudioInfo, names: &[String]) -> Option<&'a str> {
    match info.artist() {
        Some(artist) if is_various(artist, names) => Some(artist),
        Some(_) => None,
        None => info.album_artist().filter(|a| is_various(a, names)),
    }
}

/// Decide which files need retagging.
pub fn plan_fixes(files: Vec<(SourceFile, AudioInfo)>, config: &ArtistsConfig) -> FixPlan {
    let mut plan = FixPlan::default();

    for (source, info) in files {
        let Some(current) = placeholder(&info, &config.various_names) else {
            plan.untouched += 1;
            continue;
        };

        let stem = source.stem();
        let Some(parsed) = parse_filename(&stem, config) else {
            plan.unparseable.push(source);
            continue;
        };
        tracing::debug!(
            "{:?}: track {:?}, artist {:?}, title {:?}",
            stem,
            parsed.track,
            parsed.artist,
            parsed.title
        );

        let title = match info.title() {
            _ if !config.fix_title => None,
            None => Some(parsed.title.clone()),
            Some(t) if t == stem => Some(parsed.title.clone()),
            Some(_) => None,
        };

        plan.fixes.push(ArtistFix {
            current: current.to_string(),
            artist: parsed.artist,
            title,
            source,
        });
    }

    plan
}

/// Settings for one fix-artists run.
#[derive(Debug, Clone)]
pub struct ArtistOptions {
    pub inputs: Vec<PathBuf>,
    pub config: ArtistsConfig,
    pub dry_run: bool,
    /// Keep the original as `<file>.<ext>` before replacing it.
    pub backup: Option<String>,
}

/// Retag every placeholder-tagged file under `opts.inputs`.
pub async fn run_fix_artists(tools: &ToolRegistry, opts: &ArtistOptions) -> Result<Summary> {
    tools.require("ffmpeg")?;
    let prober = FfprobeProber::from_registry(tools)?;

    let sources = discover_sources(&opts.inputs, AUDIO_EXTENSIONS)?;
    if sources.is_empty() {
        return Err(Error::Validation("no audio files found".to_string()));
    }

    let pool = WorkerPool::new(resolve_jobs(opts.config.jobs));
    let mut summary = Summary::new("fix-artists");
    summary.dry_run = opts.dry_run;

    let probed = probe_sources(&pool, &prober, sources).await;
    for (source, err) in &probed.failed {
        tracing::warn!("skipping {}: {err}", source.path.display());
        summary.skip(format!("{}: {err}", source.display_name()));
    }

    let plan = plan_fixes(probed.ok, &opts.config);
    tracing::info!(
        "{} files to retag, {} already fine, {} unparseable",
        plan.fixes.len(),
        plan.untouched,
        plan.unparseable.len()
    );
    for source in &plan.unparseable {
        tracing::warn!(
            "cannot recover an artist from {:?} (separator {:?})",
            source.stem(),
            opts.config.separator
        );
        summary.skip(format!("{}: artist not found in filename", source.display_name()));
    }

    if opts.dry_run {
        for fix in &plan.fixes {
            summary.plan(fix.describe());
        }
        summary.total = plan.fixes.len();
        return Ok(summary.finish());
    }

    let tools = Arc::new(tools.clone());
    let opts = Arc::new(opts.clone());
    let results = pool
        .run(plan.fixes, move |fix| {
            let tools = Arc::clone(&tools);
            let prober = prober.clone();
            let opts = Arc::clone(&opts);
            async move { apply_fix(&tools, &prober, &opts, &fix).await }
        })
        .await;

    summary.add_results(&results);
    Ok(summary.finish())
}

async fn apply_fix(
    tools: &ToolRegistry,
    prober: &FfprobeProber,
    opts: &ArtistOptions,
    fix: &ArtistFix,
) -> Result<JobOutcome> {
    let workspace = Workspace::new(&fix.source.path)?;
    let request = RetagRequest {
        artist: fix.artist.clone(),
        title: fix.title.clone(),
    };

    retag_artist(tools, &workspace, &request).await?;
    let bytes = verify_output(&workspace.output(), 1)?;
    let written = prober.probe(&workspace.output()).await?;
    check_retagged(&written, fix, &opts.config.various_names)?;
    workspace.finalize(opts.backup.as_deref())?;
    Ok(JobOutcome::Completed { bytes })
}

/// Fail unless the rewritten file reads back with the new artist.
fn check_retagged(written: &AudioInfo, fix: &ArtistFix, names: &[String]) -> Result<()> {
    let label = fix.source.path.display().to_string();
    match written.artist() {
        Some(artist) if is_various(artist, names) => Err(Error::job(
            label,
            format!("artist still reads {artist:?} after retagging"),
        )),
        Some(artist) if artist == fix.artist => Ok(()),
        Some(artist) => Err(Error::job(
            label,
            format!("artist reads {artist:?}, expected {:?}", fix.artist),
        )),
        None => Err(Error::job(label, "artist tag missing after retagging")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snd_av::Tags;

    fn config() -> ArtistsConfig {
        ArtistsConfig::default()
    }

    fn info(tags: &[(&str, &str)]) -> AudioInfo {
        AudioInfo {
            path: PathBuf::from("/music/x.flac"),
            format_name: "flac".into(),
            duration: Some(std::time::Duration::from_secs(180)),
            size: 1000,
            bit_rate: None,
            streams: Vec::new(),
            tags: tags.iter().copied().collect::<Tags>(),
        }
    }

    fn source(stem: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(format!("/music/comp/{stem}.flac")),
            root: PathBuf::from("/music"),
        }
    }

    #[test]
    fn various_matching() {
        let names = config().various_names;
        assert!(is_various("Various Artists", &names));
        assert!(is_various("  various artists ", &names));
        assert!(is_various("va", &names));
        assert!(is_various("V.A.", &names));
        assert!(!is_various("Vanessa", &names));
        assert!(!is_various("", &names));
    }

    #[test]
    fn parses_track_prefixed_names() {
        let cfg = config();
        let cases = [
            ("01 - Artist - Song", "Artist", "Song", Some("01")),
            ("01. Artist - Song", "Artist", "Song", Some("01")),
            ("07 Artist - Song", "Artist", "Song", Some("07")),
            ("1-03 Artist - Song", "Artist", "Song", Some("1-03")),
            ("A1 Artist - Song", "Artist", "Song", Some("A1")),
            ("07_Artist - Song", "Artist", "Song", Some("07")),
            ("3) Artist - Song", "Artist", "Song", Some("3")),
            ("Artist - Song - Remix", "Artist", "Song - Remix", None),
        ];
        for (stem, artist, title, track) in cases {
            let parsed = parse_filename(stem, &cfg).unwrap_or_else(|| panic!("{stem}"));
            assert_eq!(parsed.artist, artist, "{stem}");
            assert_eq!(parsed.title, title, "{stem}");
            assert_eq!(parsed.track.as_deref(), track, "{stem}");
        }
    }

    #[test]
    fn numeric_artist_names_survive() {
        let cfg = config();
        let artists = [
            ("50 Cent - Candy Shop", "50 Cent"),
            ("10.000 Maniacs - Trouble Me", "10.000 Maniacs"),
            ("2Pac - Changes", "2Pac"),
            ("Blink-182 - Adam's Song", "Blink-182"),
            ("03 - 50 Cent - In Da Club", "50 Cent"),
        ];
        for (stem, artist) in artists {
            assert_eq!(parse_filename(stem, &cfg).unwrap().artist, artist, "{stem}");
        }
    }

    #[test]
    fn unparseable_names() {
        let cfg = config();
        assert!(parse_filename("Just A Title", &cfg).is_none());
        assert!(parse_filename("01 - Various Artists - Song", &cfg).is_none());
        assert!(parse_filename("Artist - ", &cfg).is_none());
        assert!(parse_filename(" - Song", &cfg).is_none());
    }

    #[test]
    fn track_stripping_can_be_disabled() {
        let cfg = ArtistsConfig {
            strip_track_numbers: false,
            ..config()
        };
        let parsed = parse_filename("01 - Artist - Song", &cfg).unwrap();
        assert_eq!(parsed.artist, "01");
        assert_eq!(parsed.title, "Artist - Song");
    }

    #[test]
    fn custom_separator() {
        let cfg = ArtistsConfig {
            separator: "_".into(),
            ..config()
        };
        let parsed = parse_filename("Artist_Song", &cfg).unwrap();
        assert_eq!((parsed.artist.as_str(), parsed.title.as_str()), ("Artist", "Song"));
    }

    #[test]
    fn plan_selects_placeholder_tagged_files() {
        let files = vec![
            (source("01 - Artist - Song"), info(&[("ARTIST", "Various Artists")])),
            (
                source("02 - Other - Tune"),
                info(&[("artist", "VA"), ("title", "Tune")]),
            ),
            (source("03 - Real - Thing"), info(&[("artist", "Real")])),
            (source("Untitled"), info(&[("artist", "Various")])),
            (
                source("04 - Band - Track"),
                info(&[("album_artist", "Various Artists")]),
            ),
        ];

        let plan = plan_fixes(files, &config());
        assert_eq!(plan.untouched, 1);
        assert_eq!(plan.unparseable.len(), 1);
        assert_eq!(plan.unparseable[0].stem(), "Untitled");

        let fixes: Vec<(&str, Option<&str>)> = plan
            .fixes
            .iter()
            .map(|f| (f.artist.as_str(), f.title.as_deref()))
            .collect();
        assert_eq!(
            fixes,
            vec![
                ("Artist", Some("Song")),
                ("Other", None),
                ("Band", Some("Track")),
            ]
        );
        assert_eq!(plan.fixes[0].current, "Various Artists");
    }

    #[test]
    fn title_equal_to_filename_is_replaced() {
        let stem = "05 - Someone - Something";
        let files = vec![(source(stem), info(&[("artist", "VA"), ("title", stem)]))];
        let plan = plan_fixes(files, &config());
        assert_eq!(plan.fixes[0].title.as_deref(), Some("Something"));

        let no_titles = ArtistsConfig {
            fix_title: false,
            ..config()
        };
        let files = vec![(source(stem), info(&[("artist", "VA")]))];
        assert!(plan_fixes(files, &no_titles).fixes[0].title.is_none());
    }

    #[test]
    fn describe_lists_the_change() {
        let fix = ArtistFix {
            source: source("01 - Artist - Song"),
            current: "VA".into(),
            artist: "Artist".into(),
            title: Some("Song".into()),
        };
        assert_eq!(
            fix.describe(),
            "/music/comp/01 - Artist - Song.flac: artist \"VA\" -> \"Artist\", title -> \"Song\""
        );
        assert_eq!(fix.label(), "01 - Artist - Song.flac -> Artist");
    }

    fn fix(artist: &str) -> ArtistFix {
        ArtistFix {
            source: source("01 - Artist - Song"),
            current: "Various Artists".into(),
            artist: artist.into(),
            title: None,
        }
    }

    #[test]
    fn retag_must_read_back() {
        let names = config().various_names;
        let fix = fix("Artist");

        assert!(check_retagged(&info(&[("artist", "Artist")]), &fix, &names).is_ok());

        // Stream comments copied over the new global tag.
        let err = check_retagged(&info(&[("ARTIST", "Various Artists")]), &fix, &names).unwrap_err();
        assert!(matches!(err, Error::Job { .. }));
        assert!(err.to_string().contains("still reads \"Various Artists\""));

        assert!(check_retagged(&info(&[("artist", "Someone")]), &fix, &names).is_err());
        assert!(check_retagged(&info(&[]), &fix, &names).is_err());
    }
}
