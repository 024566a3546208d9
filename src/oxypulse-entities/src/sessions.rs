use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub number: i64,
    pub started_at: DateTime,
    pub ended_at: DateTime,
    pub termination: String,
    pub samples: i64,
    pub avg_bpm: Option<f64>,
    pub bpm_count: i64,
    pub avg_spo2: Option<f64>,
    pub spo2_count: i64,
    pub avg_ir: Option<f64>,
    pub ir_count: i64,
    pub avg_red: Option<f64>,
    pub red_count: i64,
    pub history: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
