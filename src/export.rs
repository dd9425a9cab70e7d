use crate::survey::{ResponseRecord, Survey};
use anyhow::{Context, Result};
use serde_json::Value;

pub fn subject_column(survey: Survey) -> &'static str {
    match survey {
        Survey::Patient => "pid",
        Survey::Community => "area",
    }
}

pub fn filename(survey: Survey, month: Option<&str>) -> String {
    let month: String = month
        .unwrap_or("all")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    let month = if month.is_empty() { "all".into() } else { month };
    format!("{}_{}.csv", survey, month)
}

fn base_columns(survey: Survey) -> [&'static str; 6] {
    [
        "id",
        subject_column(survey),
        "name",
        "visit_date",
        "comments",
        "submitted_at",
    ]
}

/// Base columns first, then every rating key in the order it first appears.
/// A rating key that collides with a base column is written as `rating_<key>`.
pub fn render_csv(survey: Survey, rows: &[ResponseRecord]) -> Result<Vec<u8>> {
    let mut rating_keys: Vec<&str> = Vec::new();
    for row in rows {
        for key in row.ratings.keys() {
            if !rating_keys.contains(&key.as_str()) {
                rating_keys.push(key);
            }
        }
    }

    let base = base_columns(survey);
    let mut header: Vec<String> = base.iter().map(|c| c.to_string()).collect();
    header.extend(rating_keys.iter().map(|key| {
        if base.contains(key) {
            format!("rating_{}", key)
        } else {
            key.to_string()
        }
    }));

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![
            row.id.to_string(),
            row.subject.value().to_string(),
            row.name.clone(),
            row.visit_date.clone(),
            row.comments.clone(),
            row.submitted_at.clone(),
        ];
        record.extend(
            rating_keys
                .iter()
                .map(|key| row.ratings.get(key).map(cell).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }

    writer.into_inner().context("Failed to flush CSV writer")
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
