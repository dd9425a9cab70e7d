use crate::error::AppError;
use crate::export;
use crate::server::AppContext;
use crate::survey::{NewResponse, Payload, ResponseRecord, Survey};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    survey: Option<String>,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    ok: bool,
    id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SurveyQuery {
    survey: Option<String>,
    month: Option<String>,
}

impl SurveyQuery {
    fn survey(&self) -> Survey {
        match self.survey.as_deref() {
            None | Some("") => Survey::Patient,
            Some(name) => name.parse::<Survey>().unwrap_or_else(|e| {
                warn!("{}, falling back to patient", e);
                Survey::Patient
            }),
        }
    }

    fn month(&self) -> Option<&str> {
        self.month.as_deref().filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    ok: bool,
    count: usize,
    rows: Vec<ResponseRecord>,
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn submit(
    State(ctx): State<AppContext>,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let Json(request) = body.map_err(|e| {
        warn!("Rejected submission body: {}", e.body_text());
        AppError::MalformedPayload
    })?;

    let (Some(survey), Some(payload)) = (request.survey.filter(|s| !s.is_empty()), request.payload)
    else {
        return Err(AppError::MissingData);
    };

    let survey: Survey = survey.parse().map_err(|_| AppError::InvalidSurvey)?;
    let response = NewResponse::from_payload(survey, payload, Utc::now());
    let id = ctx.store.insert(survey, response).await?;

    info!("Stored {} response {}", survey, id);
    Ok(Json(SubmitResponse { ok: true, id }))
}

pub async fn list_responses(
    State(ctx): State<AppContext>,
    Query(query): Query<SurveyQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let rows = ctx.store.list(query.survey(), query.month()).await?;

    Ok(Json(ListResponse {
        ok: true,
        count: rows.len(),
        rows,
    }))
}

pub async fn export_responses(
    State(ctx): State<AppContext>,
    Query(query): Query<SurveyQuery>,
) -> Result<Response, AppError> {
    let survey = query.survey();
    let rows = ctx.store.list(survey, query.month()).await?;
    let csv = export::render_csv(survey, &rows)?;
    let filename = export::filename(survey, query.month());

    info!("Exporting {} {} rows as {}", rows.len(), survey, filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        csv,
    )
        .into_response())
}

pub async fn reset(State(ctx): State<AppContext>) -> Result<Json<Value>, AppError> {
    ctx.store.reset().await?;
    Ok(Json(json!({ "ok": true })))
}
