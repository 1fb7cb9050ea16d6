use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteLink {
    pub label: String,
    pub url: String,
}

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub class: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub class_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub covered_in_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homework_due: Option<String>,
    #[serde(default, alias = "notes", deserialize_with = "null_as_default")]
    pub notes_contents: Vec<NoteLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub first_name: String,
    pub last_name: String,
    pub dob: String,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleLevel {
    pub min: f64,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// Category weights in the order they appear in `grading.json`.
///
/// Order drives the category table, so this is a list rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Weights(pub Vec<(String, f64)>);

impl Weights {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }
}

impl<'de> Deserialize<'de> for Weights {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct WeightsVisitor;

        impl<'de> Visitor<'de> for WeightsVisitor {
            type Value = Weights;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to weight")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, f64)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, weight)) = map.next_entry::<String, f64>()? {
                    match entries.iter_mut().find(|entry| entry.0 == name) {
                        Some(entry) => entry.1 = weight,
                        None => entries.push((name, weight)),
                    }
                }
                Ok(Weights(entries))
            }
        }

        deserializer.deserialize_map(WeightsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    pub weights: Weights,
    #[serde(default)]
    pub scale: Vec<ScaleLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Attendance,
    Homework,
    Quiz,
    Test,
    Other,
}

impl Category {
    /// Unrecognized types fall into `Other`.
    pub fn classify(raw_type: &str) -> Self {
        match raw_type.trim().to_lowercase().as_str() {
            "attendance" => Category::Attendance,
            "homework" => Category::Homework,
            "quiz" => Category::Quiz,
            "test" => Category::Test,
            _ => Category::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Attendance => "attendance",
            Category::Homework => "homework",
            Category::Quiz => "quiz",
            Category::Test => "test",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRecord {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: Category,
    pub title: String,
    pub raw_value: String,
    pub numeric_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub date: String,
    pub comment: String,
}

/// Locally stored lookup. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub last_name: String,
    pub dob: String,
    pub created_at: i64,
    pub expires_at: i64,
}
