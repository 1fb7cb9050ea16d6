use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::cli::{LookupArgs, ProgressViewArgs, ResumeArgs};
use crate::dates::build_dob_from_text;
use crate::error::LookupError;
use crate::fetch::SiteClient;
use crate::formats::{Category, Comment, GradeRecord, GradingConfig, ScaleLevel, Student};
use crate::grading::{
    CategoryRow, Overall, StatusPill, category_rows, compute_category_stats, compute_overall,
    map_score_to_scale, status_pill,
};
use crate::render::{OutputFormat, render};
use crate::session::{self, LocalFsSessionStore, SessionStore, SessionTimer, Tick};
use crate::sheet::{parse_csv, student_comments, student_records};

pub const STUDENTS_JSON: &str = "data/students.json";
pub const GRADING_JSON: &str = "data/grading.json";

pub const NO_RECORDS_MESSAGE: &str = "No grade entries recorded yet.";
pub const NO_COMMENTS_MESSAGE: &str = "No comments recorded yet.";

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupForm {
    pub last_name: String,
    pub year: String,
    pub month: String,
    pub day: String,
}

impl LookupForm {
    /// Trimmed last name and `YYYY-MM-DD` date of birth.
    pub fn validate(&self) -> Result<(String, String), LookupError> {
        let last_name = self.last_name.trim();
        if last_name.is_empty()
            || self.year.trim().is_empty()
            || self.month.trim().is_empty()
            || self.day.trim().is_empty()
        {
            return Err(LookupError::MissingFields);
        }
        let dob = build_dob_from_text(&self.year, &self.month, &self.day)
            .ok_or(LookupError::InvalidDob)?;
        Ok((last_name.to_owned(), dob))
    }

    /// Prefills the form from a stored session.
    pub fn from_stored(last_name: &str, dob: &str) -> Self {
        let (year, month, day) = crate::dates::split_dob(dob).unwrap_or_default();
        Self {
            last_name: last_name.to_owned(),
            year,
            month,
            day,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    #[default]
    All,
    Attendance,
    Homework,
    Quiz,
    Test,
    Other,
}

impl RecordFilter {
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "attendance" => RecordFilter::Attendance,
            "homework" => RecordFilter::Homework,
            "quiz" => RecordFilter::Quiz,
            "test" => RecordFilter::Test,
            "other" => RecordFilter::Other,
            _ => RecordFilter::All,
        }
    }

    pub fn category(self) -> Option<Category> {
        match self {
            RecordFilter::All => None,
            RecordFilter::Attendance => Some(Category::Attendance),
            RecordFilter::Homework => Some(Category::Homework),
            RecordFilter::Quiz => Some(Category::Quiz),
            RecordFilter::Test => Some(Category::Test),
            RecordFilter::Other => Some(Category::Other),
        }
    }

    pub fn matches(self, record: &GradeRecord) -> bool {
        self.category()
            .is_none_or(|category| record.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordRow {
    pub record: GradeRecord,
    pub pill: StatusPill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub heading: String,
    pub last_updated: String,
    pub overall: Option<Overall>,
    pub grade: Option<ScaleLevel>,
    pub categories: Vec<CategoryRow>,
    pub filter: RecordFilter,
    pub records: Vec<RecordRow>,
    pub comments: Vec<Comment>,
    pub empty_message: Option<String>,
}

/// Everything fetched for one student.
#[derive(Debug, Clone)]
pub struct LookupData {
    pub student: Student,
    pub grading: GradingConfig,
    pub records: Vec<GradeRecord>,
    pub comments: Vec<Comment>,
}

impl LookupData {
    pub fn report(&self, filter: RecordFilter, last_updated: &str) -> ProgressReport {
        build_report(
            &self.student,
            &self.records,
            &self.comments,
            &self.grading,
            filter,
            last_updated,
        )
    }
}

pub fn find_student<'a>(students: &'a [Student], last_name: &str, dob: &str) -> Option<&'a Student> {
    let last_name = last_name.trim().to_lowercase();
    students
        .iter()
        .find(|s| s.last_name.to_lowercase() == last_name && s.dob == dob)
}

/// Roster and grading config first, then both sheets; each pair is fetched concurrently.
pub async fn fetch_lookup(
    client: &SiteClient,
    last_name: &str,
    dob: &str,
) -> Result<LookupData, LookupError> {
    let (students, grading) = tokio::try_join!(
        client.get_json::<Vec<Student>>(STUDENTS_JSON),
        client.get_json::<GradingConfig>(GRADING_JSON),
    )?;

    let student = find_student(&students, last_name, dob)
        .cloned()
        .ok_or(LookupError::StudentNotFound)?;
    tracing::info!(student = %student.full_name(), "matched student");

    let config = client.config();
    let (grades_csv, comments_csv) = tokio::try_join!(
        async {
            client
                .get_text(&config.grades_sheet_url)
                .await
                .context("download grade sheet")
        },
        async {
            client
                .get_text(&config.comments_sheet_url)
                .await
                .context("download comments sheet")
        },
    )?;

    let records = student_records(&parse_csv(&grades_csv), &student)?;
    let comments = student_comments(&parse_csv(&comments_csv), &student);
    tracing::info!(
        records = records.len(),
        comments = comments.len(),
        "loaded progress"
    );

    Ok(LookupData {
        student,
        grading,
        records,
        comments,
    })
}

pub fn build_report(
    student: &Student,
    records: &[GradeRecord],
    comments: &[Comment],
    grading: &GradingConfig,
    filter: RecordFilter,
    last_updated: &str,
) -> ProgressReport {
    let mut report = ProgressReport {
        heading: format!("Progress for {}", student.full_name()),
        last_updated: format!("Last updated: {last_updated}"),
        overall: None,
        grade: None,
        categories: Vec::new(),
        filter,
        records: Vec::new(),
        comments: Vec::new(),
        empty_message: None,
    };

    if records.is_empty() {
        report.empty_message = Some(NO_RECORDS_MESSAGE.to_owned());
        return report;
    }

    let stats = compute_category_stats(records, &grading.weights);
    let overall = compute_overall(&stats);
    report.grade = map_score_to_scale(overall.score, &grading.scale).cloned();
    report.overall = Some(overall);
    report.categories = category_rows(&stats, &grading.scale);
    report.records = records
        .iter()
        .filter(|record| filter.matches(record))
        .map(|record| RecordRow {
            record: record.clone(),
            pill: status_pill(record, &grading.scale),
        })
        .collect();
    report.comments = comments.to_vec();
    report
}

/// What the progress page shows after an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressPage {
    pub form: LookupForm,
    pub status: Option<String>,
    pub report: Option<ProgressReport>,
    pub session: Option<String>,
}

/// Progress page state: the last lookup, its session, and the countdown.
///
/// Lookups run one at a time through `&mut self`; nothing cancels a lookup already in flight
/// elsewhere, so when two callers race the last one to finish wins.
pub struct ProgressLookup {
    client: SiteClient,
    store: Arc<dyn SessionStore>,
    ttl: Duration,
    data: Option<LookupData>,
    filter: RecordFilter,
    timer: Option<SessionTimer>,
}

impl ProgressLookup {
    pub fn new(client: SiteClient, store: Arc<dyn SessionStore>) -> Self {
        let ttl = client.config().session_ttl;
        Self {
            client,
            store,
            ttl,
            data: None,
            filter: RecordFilter::All,
            timer: None,
        }
    }

    pub fn timer(&self) -> Option<&SessionTimer> {
        self.timer.as_ref()
    }

    pub fn data(&self) -> Option<&LookupData> {
        self.data.as_ref()
    }

    /// Fresh lookup from the form. Success replaces the session and restarts the countdown.
    pub async fn submit(&mut self, form: &LookupForm) -> ProgressPage {
        self.reset();
        let mut page = ProgressPage {
            form: form.clone(),
            ..ProgressPage::default()
        };

        let (last_name, dob) = match form.validate() {
            Ok(identity) => identity,
            Err(err) => {
                page.status = Some(err.user_message().to_owned());
                return page;
            }
        };

        match fetch_lookup(&self.client, &last_name, &dob).await {
            Ok(data) => {
                self.data = Some(data);
                let session = session::new_session(&last_name, &dob, session::now_ms(), self.ttl);
                if let Err(err) = self.store.save(&session).await {
                    tracing::warn!(?err, "failed to persist session");
                }
                self.start_timer(session.expires_at);
                page.report = self.report();
                page.session = self.countdown();
            }
            Err(err) => {
                tracing::warn!(?err, "progress lookup failed");
                page.status = Some(err.user_message().to_owned());
            }
        }
        page
    }

    /// Silently replays a stored, unexpired lookup. The countdown keeps the stored expiry.
    ///
    /// Returns `None` (with storage cleared) when there is nothing live to replay.
    pub async fn resume(&mut self) -> anyhow::Result<Option<ProgressPage>> {
        self.reset();
        let Some(stored) = session::restore(self.store.as_ref(), session::now_ms()).await? else {
            return Ok(None);
        };

        let mut page = ProgressPage {
            form: LookupForm::from_stored(&stored.last_name, &stored.dob),
            ..ProgressPage::default()
        };
        match fetch_lookup(&self.client, &stored.last_name, &stored.dob).await {
            Ok(data) => {
                self.data = Some(data);
                self.start_timer(stored.expires_at);
                page.report = self.report();
                page.session = self.countdown();
            }
            Err(err) => {
                tracing::warn!(?err, "replaying stored lookup failed");
                page.status = Some(err.user_message().to_owned());
                self.clear().await?;
            }
        }
        Ok(Some(page))
    }

    /// Forgets the session, stops the countdown and empties the page.
    pub async fn clear(&mut self) -> anyhow::Result<()> {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.data = None;
        self.store.clear().await.context("clear session")
    }

    /// Re-filters the record table of the current lookup.
    pub fn set_filter(&mut self, filter: RecordFilter) -> Option<ProgressReport> {
        self.filter = filter;
        self.report()
    }

    pub fn report(&self) -> Option<ProgressReport> {
        let today = chrono::Local::now().format("%-m/%-d/%Y").to_string();
        self.data
            .as_ref()
            .map(|data| data.report(self.filter, &today))
    }

    pub fn countdown(&self) -> Option<String> {
        match self.timer.as_ref()?.current() {
            Tick::Remaining(text) => Some(text),
            Tick::Expired => Some(session::EXPIRED_MESSAGE.to_owned()),
        }
    }

    /// Waits for the countdown to finish, then empties the page.
    pub async fn wait_for_expiry(&mut self) -> bool {
        let expired = match self.timer.as_ref() {
            Some(timer) => timer.expired().await,
            None => false,
        };
        if expired {
            self.reset();
        }
        expired
    }

    fn start_timer(&mut self, expires_at: i64) {
        if let Some(previous) = self.timer.take() {
            previous.cancel();
        }
        self.timer = Some(SessionTimer::start(expires_at, Arc::clone(&self.store)));
    }

    fn reset(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.data = None;
    }
}

fn file_lookup(client: &SiteClient, view: &ProgressViewArgs) -> ProgressLookup {
    let store = LocalFsSessionStore::new(client.config().session_file.clone());
    let mut lookup = ProgressLookup::new(client.clone(), Arc::new(store));
    lookup.set_filter(view.category);
    lookup
}

pub async fn lookup(
    args: LookupArgs,
    client: &SiteClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let form = LookupForm {
        last_name: args.last_name,
        year: args.dob_year,
        month: args.dob_month,
        day: args.dob_day,
    };
    let mut lookup = file_lookup(client, &args.view);
    let page = lookup.submit(&form).await;
    print!("{}", render(&page, format)?);
    if page.report.is_none()
        && let Some(status) = page.status
    {
        anyhow::bail!(status);
    }

    if args.view.watch {
        watch_countdown(&mut lookup).await;
    }
    Ok(())
}

pub async fn resume(
    args: ResumeArgs,
    client: &SiteClient,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut lookup = file_lookup(client, &args.view);
    let Some(page) = lookup.resume().await.context("resume session")? else {
        tracing::info!("no live session to resume");
        return Ok(());
    };
    print!("{}", render(&page, format)?);
    if page.report.is_none()
        && let Some(status) = page.status
    {
        anyhow::bail!(status);
    }

    if args.view.watch {
        watch_countdown(&mut lookup).await;
    }
    Ok(())
}

pub async fn clear(client: &SiteClient) -> anyhow::Result<()> {
    let store = LocalFsSessionStore::new(client.config().session_file.clone());
    store.clear().await.context("clear session")?;
    tracing::info!(path = %store.path().display(), "cleared session");
    Ok(())
}

/// Prints the countdown to stderr until it expires or Ctrl-C.
async fn watch_countdown(lookup: &mut ProgressLookup) {
    let Some(mut ticks) = lookup.timer().map(SessionTimer::ticks) else {
        return;
    };
    loop {
        let tick = ticks.borrow_and_update().clone();
        match tick {
            Tick::Remaining(text) => eprintln!("{text}"),
            Tick::Expired => {
                eprintln!("{}", session::EXPIRED_MESSAGE);
                break;
            }
        }
        tokio::select! {
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("stopped watching; session kept");
                return;
            }
        }
    }
    lookup.wait_for_expiry().await;
}
