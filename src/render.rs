use std::fmt::Write as _;

use anyhow::Context as _;
use pulldown_cmark::{Event, Options, Parser};
use serde::Serialize;

use crate::chrome::{NAV_LINKS, NavToggle, active_nav};
use crate::classes::ClassPage;
use crate::dates::format_date;
use crate::formats::{ClassRecord, NoteLink};
use crate::progress::{ProgressPage, ProgressReport, RecordFilter};
use crate::resources::ResourcePage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Html,
    Json,
}

/// A page ready to print or serve.
pub trait Page: Serialize {
    fn title(&self) -> &'static str;
    fn path(&self) -> &'static str;
    fn to_markdown(&self) -> String;
}

pub fn render<P: Page>(page: &P, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Markdown => Ok(page.to_markdown()),
        OutputFormat::Html => Ok(html_document(
            page.title(),
            page.path(),
            &page.to_markdown(),
        )),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(page).context("serialize page json")?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Markdown to HTML with raw HTML in the source rendered as text.
pub fn markdown_to_html(md: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(md, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

pub fn html_document(title: &str, path: &str, body_md: &str) -> String {
    let mut nav = String::new();
    for item in active_nav(path, &NAV_LINKS) {
        let class = if item.active {
            "nav-link active"
        } else {
            "nav-link"
        };
        let _ = writeln!(
            nav,
            r#"      <a class="{class}" href="{}">{}</a>"#,
            item.link.href, item.link.label
        );
    }
    let toggle = NavToggle::default();
    let body = markdown_to_html(body_md);

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
  </head>
  <body class="page-loaded">
    <nav>
      <button class="nav-toggle" type="button" aria-expanded="{expanded}">Menu</button>
      <div class="nav-links">
{nav}      </div>
    </nav>
    <main>
{body}    </main>
  </body>
</html>
"#,
        expanded = toggle.aria_expanded(),
    )
}

/// Data text as inline Markdown: punctuation that could start markup is backslash-escaped
/// and line breaks collapse to spaces.
fn md_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.chars().enumerate() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' | '|' | '!' | '~' => {
                out.push('\\');
                out.push(ch);
            }
            '-' | '+' | '=' if i == 0 => {
                out.push('\\');
                out.push(ch);
            }
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Link destinations with the characters that would end them percent-encoded.
fn md_url(url: &str) -> String {
    url.trim()
        .replace(' ', "%20")
        .replace('(', "%28")
        .replace(')', "%29")
        .replace('<', "%3C")
        .replace('>', "%3E")
}

fn table_cell(text: &str) -> String {
    if text.trim().is_empty() {
        "—".to_owned()
    } else {
        md_text(text)
    }
}

fn note_list(out: &mut String, notes: &[NoteLink]) {
    if notes.is_empty() {
        out.push_str("No notes or extra links for this class.\n\n");
        return;
    }
    out.push_str("**Notes & Resources**\n\n");
    for note in notes {
        let _ = writeln!(out, "- [{}]({})", md_text(&note.label), md_url(&note.url));
    }
    out.push('\n');
}

fn homework_line(out: &mut String, record: &ClassRecord) {
    match record.homework.as_deref() {
        Some(url) if !url.is_empty() => {
            let _ = writeln!(
                out,
                "[View Homework]({}) · Due: {}\n",
                md_url(url),
                format_date(record.homework_due.as_deref())
            );
        }
        _ => out.push_str("No homework for this class 🎉\n\n"),
    }
}

fn class_card(out: &mut String, record: &ClassRecord) {
    let date = format_date(record.date.as_deref());
    if !record.class {
        let _ = writeln!(out, "### No School\n\n{date}\n");
        out.push_str("Enjoy your day off! (Don't forget any homework)\n\n");
        let covered = if record.covered_in_class.is_empty() {
            "No class today."
        } else {
            &record.covered_in_class
        };
        let covered = md_text(covered);
        let _ = writeln!(out, "{covered}\n");
        return;
    }

    let _ = writeln!(out, "### {}\n\n{date}\n", md_text(&record.class_name));
    if !record.covered_in_class.is_empty() {
        let _ = writeln!(out, "{}\n", md_text(&record.covered_in_class));
    }
    note_list(out, &record.notes_contents);
    homework_line(out, record);
}

impl Page for ClassPage {
    fn title(&self) -> &'static str {
        "Classes"
    }

    fn path(&self) -> &'static str {
        "/index.html"
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Classes\n\n## Latest Class\n\n");
        match &self.summary {
            Some(latest) => {
                let _ = writeln!(
                    out,
                    "### {}\n\n{}\n",
                    md_text(&latest.class_name),
                    format_date(latest.date.as_deref())
                );
                if !latest.covered_in_class.is_empty() {
                    let _ = writeln!(out, "{}\n", md_text(&latest.covered_in_class));
                }
                homework_line(&mut out, latest);
            }
            None => {
                let _ = writeln!(out, "{}\n", self.summary_placeholder);
            }
        }

        out.push_str("## All Classes\n\n");
        if let Some(status) = &self.status {
            let _ = writeln!(out, "{status}\n");
        }
        for record in &self.items {
            class_card(&mut out, record);
        }
        out
    }
}

impl Page for ResourcePage {
    fn title(&self) -> &'static str {
        "Resources"
    }

    fn path(&self) -> &'static str {
        "/resources.html"
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Resources\n\n");
        if !self.search.trim().is_empty() {
            let _ = writeln!(out, "Search: {}\n", md_text(self.search.trim()));
        }
        if !self.chips.is_empty() {
            let chips = self
                .chips
                .iter()
                .map(|chip| {
                    if chip.active {
                        format!("**\\[{}\\]**", md_text(&chip.tag))
                    } else {
                        format!("\\[{}\\]", md_text(&chip.tag))
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(out, "Tags: {chips}\n");
        }
        if let Some(status) = &self.status {
            let _ = writeln!(out, "{status}\n");
        }
        for item in &self.items {
            let _ = writeln!(out, "### [{}]({})\n", md_text(&item.title), md_url(&item.url));
            if !item.description.is_empty() {
                let _ = writeln!(out, "{}\n", md_text(&item.description));
            }
            if !item.tags.is_empty() {
                let tags = item
                    .tags
                    .iter()
                    .map(|t| md_text(t))
                    .collect::<Vec<_>>()
                    .join(", ");
                let _ = writeln!(out, "Tags: {tags}\n");
            }
        }
        out
    }
}

fn report_markdown(out: &mut String, report: &ProgressReport) {
    let _ = writeln!(
        out,
        "## {}\n\n{}\n",
        md_text(&report.heading),
        report.last_updated
    );
    if let Some(message) = &report.empty_message {
        let _ = writeln!(out, "{message}\n");
        return;
    }

    out.push_str("### Overall Progress\n\n");
    let percent = report.overall.map(|o| o.percent).unwrap_or(0);
    match &report.grade {
        Some(grade) => {
            let _ = writeln!(out, "**{}** · **{percent}%** overall\n", md_text(&grade.label));
            if !grade.description.is_empty() {
                let _ = writeln!(out, "{}\n", md_text(&grade.description));
            }
        }
        None => {
            let _ = writeln!(out, "**{percent}%** overall\n");
        }
    }

    out.push_str("### Categories\n\n| Category | Average | Weight | Contribution |\n|---|---|---|---|\n");
    for row in &report.categories {
        let average = match (row.avg_percent, row.label.as_deref()) {
            (Some(avg), Some(label)) => format!("{avg}% {label}"),
            (Some(avg), None) => format!("{avg}%"),
            (None, _) => "N/A".to_owned(),
        };
        let _ = writeln!(
            out,
            "| {} | {average} | {}% | {}% |",
            table_cell(&row.name),
            row.weight_percent,
            row.contribution_percent
        );
    }
    out.push('\n');

    match report.filter {
        RecordFilter::All => out.push_str("### Records\n\n"),
        filter => {
            let name = filter.category().map(|c| c.as_str()).unwrap_or_default();
            let _ = writeln!(out, "### Records ({name})\n");
        }
    }
    out.push_str("| Date | Type | Title | Status |\n|---|---|---|---|\n");
    for row in &report.records {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            table_cell(&row.record.date),
            table_cell(&row.record.kind),
            table_cell(&row.record.title),
            table_cell(&row.pill.text)
        );
    }
    out.push('\n');

    out.push_str("### Comments\n\n");
    if report.comments.is_empty() {
        let _ = writeln!(out, "{}\n", crate::progress::NO_COMMENTS_MESSAGE);
    }
    for comment in &report.comments {
        let _ = writeln!(
            out,
            "- **{}** {}",
            md_text(&comment.date),
            md_text(&comment.comment)
        );
    }
    if !report.comments.is_empty() {
        out.push('\n');
    }
}

impl Page for ProgressPage {
    fn title(&self) -> &'static str {
        "Progress"
    }

    fn path(&self) -> &'static str {
        "/progress.html"
    }

    fn to_markdown(&self) -> String {
        let mut out = String::from("# Progress\n\n");
        if let Some(status) = &self.status {
            let _ = writeln!(out, "{status}\n");
        }
        match &self.report {
            Some(report) => report_markdown(&mut out, report),
            None if self.status.is_none() => {
                out.push_str("## Progress for …\n\n");
            }
            None => {}
        }
        if let Some(session) = &self.session {
            let _ = writeln!(out, "_{session}_\n");
        }
        out
    }
}
