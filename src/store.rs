use crate::entity::{community_responses, patient_responses};
use crate::survey::{NewResponse, Ratings, ResponseRecord, Subject, Survey};
use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use std::path::Path;
use tracing::info;

pub struct Store {
    db_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub patient: u64,
    pub community: u64,
}

impl Store {
    pub async fn open(data_dir: &Path, db_file: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;
        let db_path = data_dir.join(db_file);
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        tokio::task::spawn_blocking({
            let db_url = db_url.clone();
            move || -> Result<()> {
                let db = Database::connect(&db_url).context("Failed to open SQLite database")?;

                db.get_schema_builder()
                    .register(patient_responses::Entity)
                    .register(community_responses::Entity)
                    .apply(&db)?;

                Ok(())
            }
        })
        .await??;

        info!("Survey store ready at {}", db_path.display());
        Ok(Self { db_url })
    }

    pub async fn insert(&self, survey: Survey, response: NewResponse) -> Result<i64> {
        let db_url = self.db_url.clone();

        tokio::task::spawn_blocking(move || -> Result<i64> {
            let db = Database::connect(&db_url)?;
            let ratings_json = response.ratings.encode();
            let subject = response.subject.value().to_string();

            let id = match survey {
                Survey::Patient => {
                    let record = patient_responses::ActiveModel {
                        id: NotSet,
                        pid: Set(subject),
                        name: Set(response.name),
                        visit_date: Set(response.visit_date),
                        ratings_json: Set(ratings_json),
                        comments: Set(response.comments),
                        submitted_at: Set(response.submitted_at),
                    };
                    patient_responses::Entity::insert(record)
                        .exec(&db)?
                        .last_insert_id
                }
                Survey::Community => {
                    let record = community_responses::ActiveModel {
                        id: NotSet,
                        name: Set(response.name),
                        area: Set(subject),
                        ratings_json: Set(ratings_json),
                        comments: Set(response.comments),
                        submitted_at: Set(response.submitted_at),
                        visit_date: Set(response.visit_date),
                    };
                    community_responses::Entity::insert(record)
                        .exec(&db)?
                        .last_insert_id
                }
            };

            Ok(id)
        })
        .await?
    }

    /// Rows for `survey`, newest first. `month` is a `YYYY-MM` prefix of the visit date.
    pub async fn list(&self, survey: Survey, month: Option<&str>) -> Result<Vec<ResponseRecord>> {
        let db_url = self.db_url.clone();
        let month = month.map(str::to_string);

        tokio::task::spawn_blocking(move || -> Result<Vec<ResponseRecord>> {
            let db = Database::connect(&db_url)?;

            let records = match survey {
                Survey::Patient => {
                    let mut query = patient_responses::Entity::find()
                        .order_by_desc(patient_responses::Column::Id);
                    if let Some(month) = month {
                        query = query.filter(visit_month(month));
                    }
                    query.all(&db)?.into_iter().map(Into::into).collect()
                }
                Survey::Community => {
                    let mut query = community_responses::Entity::find()
                        .order_by_desc(community_responses::Column::Id);
                    if let Some(month) = month {
                        query = query.filter(visit_month(month));
                    }
                    query.all(&db)?.into_iter().map(Into::into).collect()
                }
            };

            Ok(records)
        })
        .await?
    }

    pub async fn reset(&self) -> Result<ResetSummary> {
        let db_url = self.db_url.clone();

        let summary = tokio::task::spawn_blocking(move || -> Result<ResetSummary> {
            let db = Database::connect(&db_url)?;
            let txn = db.begin()?;

            let patient = patient_responses::Entity::delete_many()
                .exec(&txn)?
                .rows_affected;
            let community = community_responses::Entity::delete_many()
                .exec(&txn)?
                .rows_affected;

            txn.commit()?;
            Ok(ResetSummary { patient, community })
        })
        .await??;

        info!(
            "Cleared survey data ({} patient, {} community rows)",
            summary.patient, summary.community
        );
        Ok(summary)
    }
}

fn visit_month(month: String) -> Condition {
    Condition::all().add(Expr::cust_with_values(
        "substr(visit_date, 1, 7) = ?",
        [month],
    ))
}

impl From<patient_responses::Model> for ResponseRecord {
    fn from(r: patient_responses::Model) -> Self {
        Self {
            id: r.id,
            subject: Subject::Pid(r.pid),
            name: r.name,
            visit_date: r.visit_date,
            ratings: Ratings::decode(&r.ratings_json),
            comments: r.comments,
            submitted_at: r.submitted_at,
        }
    }
}

impl From<community_responses::Model> for ResponseRecord {
    fn from(r: community_responses::Model) -> Self {
        Self {
            id: r.id,
            subject: Subject::Area(r.area),
            name: r.name,
            visit_date: r.visit_date,
            ratings: Ratings::decode(&r.ratings_json),
            comments: r.comments,
            submitted_at: r.submitted_at,
        }
    }
}
