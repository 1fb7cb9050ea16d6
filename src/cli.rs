use clap::{Args, Parser, Subcommand};

use crate::classes::ClassFilter;
use crate::progress::RecordFilter;
use crate::render::OutputFormat;

#[derive(Debug, Parser)]
#[command(author, version, about = "Classroom site pages: class feed, resources, and progress lookup")]
pub struct Cli {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Output format for the rendered page.
    #[arg(long, value_enum, default_value_t = OutputFormat::Markdown, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the site's data lives. Unset flags fall back to `--config`, then built-in defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct SiteArgs {
    /// YAML file with site settings.
    #[arg(long, env = "CLASSROOM_CONFIG", global = true)]
    pub config: Option<String>,

    /// Base URL the `data/*.json` files are served from (http/https).
    #[arg(long, env = "CLASSROOM_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Published CSV export of the grade sheet.
    #[arg(long, env = "CLASSROOM_GRADES_SHEET_URL", global = true)]
    pub grades_sheet_url: Option<String>,

    /// Published CSV export of the comments sheet.
    #[arg(long, env = "CLASSROOM_COMMENTS_SHEET_URL", global = true)]
    pub comments_sheet_url: Option<String>,

    /// File holding the saved progress session.
    #[arg(long, env = "CLASSROOM_SESSION_FILE", global = true)]
    pub session_file: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Latest class and the class list.
    Classes(ClassesArgs),
    /// Resource directory with search and tag filters.
    Resources(ResourcesArgs),
    /// Student progress lookup.
    Progress {
        #[command(subcommand)]
        command: ProgressCommand,
    },
}

#[derive(Debug, Args)]
pub struct ClassesArgs {
    /// Which entries to list.
    #[arg(long, value_enum, default_value_t = ClassFilter::All)]
    pub filter: ClassFilter,
}

#[derive(Debug, Args)]
pub struct ResourcesArgs {
    /// Free-text search over title, description and tags.
    #[arg(long, default_value = "")]
    pub search: String,

    /// Required tag (repeat to require several).
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum ProgressCommand {
    /// Look up a student and save the session.
    Lookup(LookupArgs),
    /// Replay the saved session if it has not expired.
    Resume(ResumeArgs),
    /// Forget the saved session.
    Clear,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub dob_year: String,

    #[arg(long)]
    pub dob_month: String,

    #[arg(long)]
    pub dob_day: String,

    #[command(flatten)]
    pub view: ProgressViewArgs,
}

#[derive(Debug, Args)]
pub struct ResumeArgs {
    #[command(flatten)]
    pub view: ProgressViewArgs,
}

#[derive(Debug, Args)]
pub struct ProgressViewArgs {
    /// Only show records of this category.
    #[arg(long, value_enum, default_value_t = RecordFilter::All)]
    pub category: RecordFilter,

    /// Stay running and print the session countdown until it expires.
    #[arg(long)]
    pub watch: bool,
}
