use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Survey {
    Patient,
    Community,
}

impl Survey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Survey::Patient => "patient",
            Survey::Community => "community",
        }
    }
}

impl fmt::Display for Survey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised survey '{0}'")]
pub struct UnknownSurvey(pub String);

impl FromStr for Survey {
    type Err = UnknownSurvey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Survey::Patient),
            "community" => Ok(Survey::Community),
            other => Err(UnknownSurvey(other.to_string())),
        }
    }
}

/// Category to value mapping submitted with a response. Stored as JSON text;
/// [`Ratings::decode`] is the single place unreadable text turns into an
/// empty mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratings(pub Map<String, Value>);

impl Ratings {
    pub fn encode(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Payload {
    #[serde(deserialize_with = "loose_text")]
    pub pid: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub area: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "loose_text")]
    pub visit_date: Option<String>,
    pub ratings: Option<Ratings>,
    #[serde(deserialize_with = "loose_text")]
    pub comments: Option<String>,
}

/// Free-text fields accept any scalar; numbers and bools keep their JSON text.
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(de::Error::custom("expected a text value")),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Pid(String),
    Area(String),
}

impl Subject {
    pub fn value(&self) -> &str {
        match self {
            Subject::Pid(v) | Subject::Area(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub subject: Subject,
    pub name: String,
    pub visit_date: String,
    pub ratings: Ratings,
    pub comments: String,
    pub submitted_at: String,
}

impl NewResponse {
    pub fn from_payload(survey: Survey, payload: Payload, now: DateTime<Utc>) -> Self {
        let subject = match survey {
            Survey::Patient => Subject::Pid(payload.pid.unwrap_or_default()),
            Survey::Community => Subject::Area(payload.area.unwrap_or_default()),
        };

        let visit_date = payload
            .visit_date
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| now.format("%Y-%m-%d").to_string());

        Self {
            subject,
            name: payload.name.unwrap_or_default(),
            visit_date,
            ratings: payload.ratings.unwrap_or_default(),
            comments: payload.comments.unwrap_or_default(),
            submitted_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    pub id: i64,
    #[serde(flatten)]
    pub subject: Subject,
    pub name: String,
    pub visit_date: String,
    pub ratings: Ratings,
    pub comments: String,
    pub submitted_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap()
    }

    #[test]
    fn survey_parses_known_names_only() {
        assert_eq!("patient".parse::<Survey>(), Ok(Survey::Patient));
        assert_eq!("community".parse::<Survey>(), Ok(Survey::Community));
        assert!("Patient".parse::<Survey>().is_err());
        assert!("".parse::<Survey>().is_err());
    }

    #[test]
    fn decode_falls_back_to_empty() {
        assert_eq!(Ratings::decode(""), Ratings::default());
        assert_eq!(Ratings::decode("not json"), Ratings::default());
        assert_eq!(Ratings::decode("[1,2]"), Ratings::default());
        assert_eq!(Ratings::decode("null"), Ratings::default());

        let ratings = Ratings::decode(r#"{"q1":5,"q2":"good"}"#);
        assert_eq!(ratings.get("q1"), Some(&json!(5)));
        assert_eq!(ratings.get("q2"), Some(&json!("good")));
    }

    #[test]
    fn empty_payload_gets_defaults() {
        let record = NewResponse::from_payload(Survey::Patient, Payload::default(), instant());
        assert_eq!(record.subject, Subject::Pid(String::new()));
        assert_eq!(record.visit_date, "2024-05-01");
        assert_eq!(record.ratings.encode(), "{}");
        assert_eq!(record.submitted_at, "2024-05-01T10:20:30.000Z");
    }

    #[test]
    fn empty_visit_date_is_treated_as_missing() {
        let payload = Payload {
            visit_date: Some(String::new()),
            ..Default::default()
        };
        let record = NewResponse::from_payload(Survey::Community, payload, instant());
        assert_eq!(record.visit_date, "2024-05-01");
    }

    #[test]
    fn community_uses_area_as_subject() {
        let payload: Payload = serde_json::from_value(json!({
            "pid": "ignored",
            "area": "North",
            "visit_date": "2024-04-12",
            "ratings": {"q1": 4}
        }))
        .unwrap();

        let record = NewResponse::from_payload(Survey::Community, payload, instant());
        assert_eq!(record.subject, Subject::Area("North".into()));
        assert_eq!(record.subject.value(), "North");
        assert_eq!(record.visit_date, "2024-04-12");
    }

    #[test]
    fn non_object_ratings_are_rejected() {
        let result = serde_json::from_value::<Payload>(json!({"ratings": [1, 2, 3]}));
        assert!(result.is_err());

        let payload: Payload = serde_json::from_value(json!({"ratings": null})).unwrap();
        assert!(payload.ratings.is_none());
    }

    #[test]
    fn scalar_text_fields_are_stringified() {
        let payload: Payload = serde_json::from_value(json!({
            "pid": 123,
            "name": 5,
            "comments": true,
            "area": null
        }))
        .unwrap();
        assert_eq!(payload.pid.as_deref(), Some("123"));
        assert_eq!(payload.name.as_deref(), Some("5"));
        assert_eq!(payload.comments.as_deref(), Some("true"));
        assert_eq!(payload.area, None);

        assert!(serde_json::from_value::<Payload>(json!({"name": ["A"]})).is_err());
        assert!(serde_json::from_value::<Payload>(json!({"pid": {"id": 1}})).is_err());
    }

    #[test]
    fn ratings_keep_submission_order() {
        let ratings = Ratings::decode(r#"{"q2":1,"q1":2,"q10":3}"#);
        let keys: Vec<&str> = ratings.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["q2", "q1", "q10"]);
        assert_eq!(ratings.encode(), r#"{"q2":1,"q1":2,"q10":3}"#);
    }

    #[test]
    fn record_serializes_subject_inline() {
        let record = ResponseRecord {
            id: 7,
            subject: Subject::Pid("P-1".into()),
            name: "A".into(),
            visit_date: "2024-05-01".into(),
            ratings: Ratings::decode(r#"{"q1":5}"#),
            comments: String::new(),
            submitted_at: "2024-05-01T10:20:30.000Z".into(),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["pid"], json!("P-1"));
        assert_eq!(value["ratings"], json!({"q1": 5}));
        assert!(value.get("area").is_none());
    }
}
