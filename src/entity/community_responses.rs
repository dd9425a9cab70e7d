use sea_orm::entity::prelude::*;

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "community_responses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub area: String,
    pub ratings_json: String,
    pub comments: String,
    pub submitted_at: String,
    pub visit_date: String,
}

impl ActiveModelBehavior for ActiveModel {}
