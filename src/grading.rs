use serde::Serialize;

use crate::formats::{Category, GradeRecord, ScaleLevel, Weights};

/// Raw score sum for one weighted category; `avg` is normalized to [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub name: String,
    pub weight: f64,
    pub total: f64,
    pub count: usize,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overall {
    pub score: f64,
    pub percent: i64,
}

/// Rounds half up, matching how percentages have always been shown on the site.
pub fn round_half_up(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

/// One entry per configured category, in configuration order.
///
/// Records in a category with no (or zero) weight, or without a numeric score, are ignored.
pub fn compute_category_stats(records: &[GradeRecord], weights: &Weights) -> Vec<CategoryStats> {
    let mut stats = weights
        .iter()
        .map(|(name, weight)| CategoryStats {
            name: name.to_owned(),
            weight,
            total: 0.0,
            count: 0,
            avg: None,
        })
        .collect::<Vec<_>>();

    for record in records {
        let Some(score) = record.numeric_score else {
            continue;
        };
        let Some(entry) = stats
            .iter_mut()
            .find(|s| s.name == record.category.as_str())
        else {
            continue;
        };
        if entry.weight == 0.0 {
            continue;
        }
        entry.total += score;
        entry.count += 1;
    }

    for entry in &mut stats {
        if entry.count > 0 {
            entry.avg = Some(entry.total / entry.count as f64 / 100.0);
        }
    }
    stats
}

/// Weighted mean over categories that have at least one score.
///
/// Weights are renormalized by the total weight actually used, so they need not sum to 1.
pub fn compute_overall(stats: &[CategoryStats]) -> Overall {
    let (weighted_sum, weight_used) = stats
        .iter()
        .filter_map(|s| s.avg.map(|avg| (avg * s.weight, s.weight)))
        .fold((0.0, 0.0), |(sum, used), (part, weight)| {
            (sum + part, used + weight)
        });

    if weight_used == 0.0 {
        return Overall {
            score: 0.0,
            percent: 0,
        };
    }

    let score = weighted_sum / weight_used;
    Overall {
        score,
        percent: round_half_up(score * 100.0),
    }
}

/// Highest threshold the score reaches; below every threshold, the lowest level.
pub fn map_score_to_scale(score: f64, scale: &[ScaleLevel]) -> Option<&ScaleLevel> {
    let score = if score.is_nan() { 0.0 } else { score };
    let mut sorted = scale.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| b.min.total_cmp(&a.min));
    sorted
        .iter()
        .find(|level| score >= level.min)
        .or_else(|| sorted.last())
        .copied()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub name: String,
    pub avg_percent: Option<i64>,
    pub label: Option<String>,
    pub weight_percent: i64,
    pub contribution_percent: i64,
}

pub fn category_rows(stats: &[CategoryStats], scale: &[ScaleLevel]) -> Vec<CategoryRow> {
    stats
        .iter()
        .map(|s| CategoryRow {
            name: capitalize(&s.name),
            avg_percent: s.avg.map(|avg| round_half_up(avg * 100.0)),
            label: s
                .avg
                .and_then(|avg| map_score_to_scale(avg, scale))
                .map(|level| level.label.clone()),
            weight_percent: round_half_up(s.weight * 100.0),
            contribution_percent: s
                .avg
                .map(|avg| round_half_up(avg * s.weight * 100.0))
                .unwrap_or(0),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PillTone {
    Ok,
    Warn,
    Bad,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusPill {
    pub tone: PillTone,
    pub text: String,
}

impl StatusPill {
    fn new(tone: PillTone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// Badge shown next to a single grade entry.
pub fn status_pill(record: &GradeRecord, scale: &[ScaleLevel]) -> StatusPill {
    if record.raw_value.is_empty() {
        return StatusPill::new(PillTone::Neutral, "—");
    }

    if record.category == Category::Attendance {
        return match record.raw_value.trim().to_uppercase().as_str() {
            "Y" => StatusPill::new(PillTone::Ok, "Present"),
            "N" => StatusPill::new(PillTone::Bad, "Absent"),
            _ => StatusPill::new(PillTone::Neutral, record.raw_value.clone()),
        };
    }

    let Some(score) = record.numeric_score else {
        return StatusPill::new(PillTone::Neutral, record.raw_value.clone());
    };

    let label = map_score_to_scale(score / 100.0, scale)
        .map(|level| level.label.as_str())
        .unwrap_or_default();
    let tone = match label {
        "E" => PillTone::Ok,
        "M" => PillTone::Warn,
        "P" => PillTone::Bad,
        _ => PillTone::Neutral,
    };
    StatusPill::new(tone, format!("{score}% ({label})"))
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
