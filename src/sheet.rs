//! Published gradebook exports.
//!
//! The grade sheet has four header rows (dates, types, titles, include flags) followed by
//! one row per student with the name in column 0. The comments sheet has a single header row
//! naming its columns.

use crate::error::LookupError;
use crate::formats::{Category, Comment, GradeRecord, Student};

const DATE_ROW: usize = 0;
const TYPE_ROW: usize = 1;
const TITLE_ROW: usize = 2;
const INCLUDE_ROW: usize = 3;
const FIRST_STUDENT_ROW: usize = 4;
const NAME_COL: usize = 0;

/// Splits comma-separated text into rows of fields.
///
/// Double-quoted fields may contain commas, line breaks and `""` escapes.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    row.push(field);
    rows.push(row);
    rows
}

/// Name cell without its trailing parenthetical (e.g. a section code), lowercased.
pub fn base_name(cell: &str) -> String {
    let before_paren = cell.split('(').next().unwrap_or_default();
    before_paren.trim().to_lowercase()
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(|c| c.trim()).unwrap_or_default()
}

fn row_matches(row: &[String], col: usize, full_name: &str) -> bool {
    let name = cell(row, col);
    !name.is_empty() && base_name(name) == full_name
}

/// Grade records for one student, one per included, non-empty column.
pub fn student_records(
    rows: &[Vec<String>],
    student: &Student,
) -> Result<Vec<GradeRecord>, LookupError> {
    if rows.len() <= FIRST_STUDENT_ROW {
        return Ok(Vec::new());
    }

    let full_name = student.full_name().to_lowercase();
    let student_row = rows
        .iter()
        .skip(FIRST_STUDENT_ROW)
        .find(|row| row_matches(row, NAME_COL, &full_name))
        .ok_or(LookupError::NotInGradeSheet)?;

    let header = &rows[DATE_ROW];
    let mut records = Vec::new();
    for col in (NAME_COL + 1)..header.len() {
        if cell(&rows[INCLUDE_ROW], col).to_uppercase() != "TRUE" {
            continue;
        }

        let date = cell(header, col);
        let raw_type = cell(&rows[TYPE_ROW], col);
        let title = cell(&rows[TITLE_ROW], col);
        let value = cell(student_row, col);
        if date.is_empty() && raw_type.is_empty() && title.is_empty() && value.is_empty() {
            continue;
        }

        let category = Category::classify(raw_type);
        records.push(GradeRecord {
            date: date.to_owned(),
            kind: display_type(raw_type),
            category,
            title: title.to_owned(),
            raw_value: value.to_owned(),
            numeric_score: numeric_score(category, value),
        });
    }

    tracing::debug!(count = records.len(), "parsed grade records");
    Ok(records)
}

/// Lowercased type with its first letter capitalized; empty types read "N/A".
fn display_type(raw_type: &str) -> String {
    let lowered = raw_type.to_lowercase();
    if lowered.is_empty() {
        return "N/A".to_owned();
    }
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => lowered,
    }
}

/// Score on a 0-100 scale, or `None` when the value is not scorable.
pub fn numeric_score(category: Category, value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if category == Category::Attendance {
        return match value.to_uppercase().as_str() {
            "Y" => Some(100.0),
            "N" => Some(0.0),
            _ => None,
        };
    }

    if let Ok(n) = value.parse::<f64>()
        && n.is_finite()
    {
        return Some(n);
    }

    match value.to_uppercase().as_str() {
        "E" => Some(95.0),
        "M" => Some(80.0),
        "P" => Some(60.0),
        _ => None,
    }
}

/// Comments for one student. A sheet missing any required column yields none.
pub fn student_comments(rows: &[Vec<String>], student: &Student) -> Vec<Comment> {
    let Some(header) = rows.first() else {
        return Vec::new();
    };
    let header = header.iter().map(|c| c.to_lowercase()).collect::<Vec<_>>();
    let position = |name: &str| header.iter().position(|c| c == name);
    let (Some(name_idx), Some(date_idx), Some(comment_idx)) =
        (position("student name"), position("date"), position("comment"))
    else {
        tracing::debug!(?header, "comments sheet is missing a required column");
        return Vec::new();
    };

    let full_name = student.full_name().to_lowercase();
    rows.iter()
        .skip(1)
        .filter(|row| row_matches(row, name_idx, &full_name))
        .map(|row| Comment {
            date: row.get(date_idx).cloned().unwrap_or_default(),
            comment: row.get(comment_idx).cloned().unwrap_or_default(),
        })
        .collect()
}
