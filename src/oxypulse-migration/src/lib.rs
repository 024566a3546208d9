pub use sea_orm_migration::prelude::*;

pub mod m20250301_000001_settings;
pub mod m20250301_000002_sessions;
mod m20250315_000003_sessions_started_at_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_settings::Migration),
            Box::new(m20250301_000002_sessions::Migration),
            Box::new(m20250315_000003_sessions_started_at_index::Migration),
        ]
    }
}
