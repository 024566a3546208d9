use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Sessions::Number)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Sessions::StartedAt).date_time().not_null())
                    .col(ColumnDef::new(Sessions::EndedAt).date_time().not_null())
                    .col(ColumnDef::new(Sessions::Termination).string().not_null())
                    .col(ColumnDef::new(Sessions::Samples).big_integer().not_null())
                    // Averages stay NULL when the channel had no plausible reading
                    .col(ColumnDef::new(Sessions::AvgBpm).double().null())
                    .col(ColumnDef::new(Sessions::BpmCount).big_integer().not_null())
                    .col(ColumnDef::new(Sessions::AvgSpo2).double().null())
                    .col(ColumnDef::new(Sessions::Spo2Count).big_integer().not_null())
                    .col(ColumnDef::new(Sessions::AvgIr).double().null())
                    .col(ColumnDef::new(Sessions::IrCount).big_integer().not_null())
                    .col(ColumnDef::new(Sessions::AvgRed).double().null())
                    .col(ColumnDef::new(Sessions::RedCount).big_integer().not_null())
                    .col(ColumnDef::new(Sessions::History).json().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Sessions {
    Table,
    Id,
    Number,
    StartedAt,
    EndedAt,
    Termination,
    Samples,
    AvgBpm,
    BpmCount,
    AvgSpo2,
    Spo2Count,
    AvgIr,
    IrCount,
    AvgRed,
    RedCount,
    History,
}
