use std::time::Duration;

use anyhow::Context as _;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::SiteConfig;

const USER_AGENT_VALUE: &str = concat!("classroom/", env!("CARGO_PKG_VERSION"));

/// HTTP access to the site's static data files and the published sheets.
///
/// A non-2xx status or an unparseable body is the only failure signal.
#[derive(Debug, Clone)]
pub struct SiteClient {
    http: reqwest::Client,
    config: SiteConfig,
}

impl SiteClient {
    pub fn new(config: SiteConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build site http client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub async fn get_json<T: DeserializeOwned>(&self, relative: &str) -> anyhow::Result<T> {
        let url = self.config.endpoint(relative)?;
        let body = self
            .get_body(&url, "application/json")
            .await
            .with_context(|| format!("fetch {relative}"))?;
        serde_json::from_str(&body).with_context(|| format!("parse {relative}"))
    }

    pub async fn get_text(&self, url: &Url) -> anyhow::Result<String> {
        self.get_body(url, "text/csv,text/plain;q=0.9,*/*;q=0.8")
            .await
    }

    async fn get_body(&self, url: &Url, accept: &str) -> anyhow::Result<String> {
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(url.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, accept)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        response
            .text()
            .await
            .with_context(|| format!("read body of {url}"))
    }
}
