use std::cmp::Ordering;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::ClassesArgs;
use crate::dates::parse_iso_date;
use crate::fetch::SiteClient;
use crate::formats::ClassRecord;
use crate::render::{OutputFormat, render};

pub const CLASSES_JSON: &str = "data/classes.json";

pub const LOAD_FAILED_MESSAGE: &str =
    "Oops! We could not load the class list right now. Please try again later.";
pub const SUMMARY_UNAVAILABLE: &str = "Unable to load class highlight.";
pub const NO_CLASSES_YET: &str = "No class entries yet. Check back soon!";
pub const EMPTY_FILTER_MESSAGE: &str = "No items match this filter yet.";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ClassFilter {
    #[default]
    All,
    Classes,
    NoSchool,
}

impl ClassFilter {
    /// Unknown values show everything.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "classes" => ClassFilter::Classes,
            "no-school" => ClassFilter::NoSchool,
            _ => ClassFilter::All,
        }
    }

    pub fn matches(self, record: &ClassRecord) -> bool {
        match self {
            ClassFilter::All => true,
            ClassFilter::Classes => record.class,
            ClassFilter::NoSchool => !record.class,
        }
    }
}

/// Class-day records for one page load, newest first.
#[derive(Debug, Clone, Default)]
pub struct ClassFeed {
    records: Vec<ClassRecord>,
}

impl ClassFeed {
    pub async fn load(client: &SiteClient) -> anyhow::Result<Self> {
        let records: Vec<ClassRecord> = client
            .get_json(CLASSES_JSON)
            .await
            .context("load class list")?;
        tracing::info!(count = records.len(), "loaded class list");
        Ok(Self::from_records(records))
    }

    pub fn from_records(mut records: Vec<ClassRecord>) -> Self {
        sort_newest_first(&mut records);
        Self { records }
    }

    pub fn records(&self) -> &[ClassRecord] {
        &self.records
    }

    /// Most recent day that actually had class.
    pub fn latest(&self) -> Option<&ClassRecord> {
        self.records.iter().find(|record| record.class)
    }

    pub fn filter(&self, filter: ClassFilter) -> Vec<&ClassRecord> {
        self.records
            .iter()
            .filter(|record| filter.matches(record))
            .collect()
    }

    pub fn page(&self, filter: ClassFilter) -> ClassPage {
        let items = self
            .filter(filter)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let status = items.is_empty().then(|| EMPTY_FILTER_MESSAGE.to_owned());
        ClassPage {
            filter,
            summary: self.latest().cloned(),
            summary_placeholder: NO_CLASSES_YET.to_owned(),
            items,
            status,
        }
    }
}

/// Everything the class page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPage {
    pub filter: ClassFilter,
    pub summary: Option<ClassRecord>,
    pub summary_placeholder: String,
    pub items: Vec<ClassRecord>,
    pub status: Option<String>,
}

impl ClassPage {
    pub fn load_failed() -> Self {
        Self {
            filter: ClassFilter::All,
            summary: None,
            summary_placeholder: SUMMARY_UNAVAILABLE.to_owned(),
            items: Vec::new(),
            status: Some(LOAD_FAILED_MESSAGE.to_owned()),
        }
    }
}

/// Loads the feed and degrades to the static failure page on any error.
pub async fn class_page(client: &SiteClient, filter: ClassFilter) -> ClassPage {
    match ClassFeed::load(client).await {
        Ok(feed) => feed.page(filter),
        Err(err) => {
            tracing::warn!(?err, "failed to load classes");
            ClassPage::load_failed()
        }
    }
}

pub async fn run(
    args: ClassesArgs,
    client: &SiteClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match ClassFeed::load(client).await {
        Ok(feed) => {
            print!("{}", render(&feed.page(args.filter), format)?);
            Ok(())
        }
        Err(err) => {
            print!("{}", render(&ClassPage::load_failed(), format)?);
            Err(err)
        }
    }
}

/// Descending by date; records without a valid date go last in their original order.
pub fn sort_newest_first(records: &mut [ClassRecord]) {
    records.sort_by(|a, b| {
        let a = a.date.as_deref().and_then(parse_iso_date);
        let b = b.date.as_deref().and_then(parse_iso_date);
        match (a, b) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}
