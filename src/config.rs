use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use url::Url;

use crate::cli::SiteArgs;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/";

pub const DEFAULT_GRADES_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTyQUGq3_eYNkqU_-DrOTcaMlEW6Vkk2BL8dVS7p4W0-r0103YHwx8OJYwrTb1ykf1eYfUwavbccIBK/pub?gid=0&single=true&output=csv";

pub const DEFAULT_COMMENTS_SHEET_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTyQUGq3_eYNkqU_-DrOTcaMlEW6Vkk2BL8dVS7p4W0-r0103YHwx8OJYwrTb1ykf1eYfUwavbccIBK/pub?gid=1495378420&single=true&output=csv";

pub const DEFAULT_SESSION_FILE: &str = ".classroom/session.json";

pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Optional YAML overrides. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    pub grades_sheet_url: Option<String>,
    pub comments_sheet_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub session_ttl_secs: Option<u64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        serde_yaml::from_str(&yaml).with_context(|| format!("parse config: {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub base_url: Url,
    pub grades_sheet_url: Url,
    pub comments_sheet_url: Url,
    pub session_file: PathBuf,
    pub session_ttl: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            grades_sheet_url: Url::parse(DEFAULT_GRADES_SHEET_URL)
                .expect("default grades sheet url is valid"),
            comments_sheet_url: Url::parse(DEFAULT_COMMENTS_SHEET_URL)
                .expect("default comments sheet url is valid"),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl SiteConfig {
    /// Defaults, then the YAML file, then flags (which clap already merged with `CLASSROOM_*`).
    pub fn resolve(args: &SiteArgs) -> anyhow::Result<Self> {
        let file = match args.config.as_deref() {
            Some(path) => ConfigFile::load(Path::new(path)).context("load --config")?,
            None => ConfigFile::default(),
        };
        let mut config = Self::default().merged(file).context("apply config file")?;

        if let Some(raw) = args.base_url.as_deref() {
            config.base_url = parse_base_url(raw).context("parse --base-url")?;
        }
        if let Some(raw) = args.grades_sheet_url.as_deref() {
            config.grades_sheet_url =
                parse_http_url(raw).context("parse --grades-sheet-url")?;
        }
        if let Some(raw) = args.comments_sheet_url.as_deref() {
            config.comments_sheet_url =
                parse_http_url(raw).context("parse --comments-sheet-url")?;
        }
        if let Some(path) = args.session_file.as_deref() {
            config.session_file = PathBuf::from(path);
        }

        tracing::debug!(?config, "resolved site config");
        Ok(config)
    }

    pub fn merged(mut self, file: ConfigFile) -> anyhow::Result<Self> {
        if let Some(raw) = file.base_url.as_deref() {
            self.base_url = parse_base_url(raw).context("parse base_url")?;
        }
        if let Some(raw) = file.grades_sheet_url.as_deref() {
            self.grades_sheet_url = parse_http_url(raw).context("parse grades_sheet_url")?;
        }
        if let Some(raw) = file.comments_sheet_url.as_deref() {
            self.comments_sheet_url = parse_http_url(raw).context("parse comments_sheet_url")?;
        }
        if let Some(path) = file.session_file {
            self.session_file = path;
        }
        if let Some(secs) = file.session_ttl_secs {
            if secs == 0 {
                anyhow::bail!("session_ttl_secs must be positive");
            }
            self.session_ttl = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Resolves a data path such as `data/classes.json` against the base URL.
    pub fn endpoint(&self, relative: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(relative)
            .with_context(|| format!("join {relative} onto {}", self.base_url))
    }
}

fn parse_http_url(raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("invalid url: {raw}"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("url must be http/https: {url}");
    }
    Ok(url)
}

/// Base URLs always end in `/` so relative data paths append instead of replacing.
fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let mut url = parse_http_url(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
