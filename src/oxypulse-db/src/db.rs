use chrono::Local;
use oxypulse_entities::settings;
use oxypulse_migration::{Migrator, MigratorTrait, OnConflict};
use oxypulse_types::{Channel, LastValues};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Set};

#[derive(Clone)]
pub struct DatabaseHandler {
    pub(crate) db: DatabaseConnection,
}

impl DatabaseHandler {
    pub(crate) const SESSION_COUNTER_KEY: &'static str = "monitoring_sessions";

    pub async fn new<C>(path: C) -> anyhow::Result<Self>
    where
        C: Into<ConnectOptions>,
    {
        let db = Database::connect(path).await?;
        Migrator::up(&db, None).await?;

        Ok(Self { db })
    }

    pub async fn set_value(&self, key: &str, value: String) -> anyhow::Result<()> {
        upsert_value(&self.db, key, value).await
    }

    pub async fn get_value(&self, key: &str) -> anyhow::Result<Option<String>> {
        get_value(&self.db, key).await
    }

    /// Last plausible reading per channel, as written by `store_last_values`.
    pub async fn last_values(&self) -> anyhow::Result<LastValues> {
        let mut last = LastValues::default();
        for channel in Channel::ALL {
            let value = self.get_value(channel.last_value_key()).await?;
            if let Some(value) = value.and_then(|v| v.parse().ok()) {
                last.set(channel, value);
            }
        }

        Ok(last)
    }

    pub async fn store_last_values(&self, last: &LastValues) -> anyhow::Result<()> {
        for (channel, value) in last.iter() {
            upsert_value(&self.db, channel.last_value_key(), format_value(channel, value)).await?;
        }

        Ok(())
    }

    pub async fn session_count(&self) -> anyhow::Result<u64> {
        session_count(&self.db).await
    }
}

pub(crate) async fn get_value<C>(conn: &C, key: &str) -> anyhow::Result<Option<String>>
where
    C: ConnectionTrait,
{
    let model = settings::Entity::find_by_id(key.to_owned()).one(conn).await?;
    Ok(model.map(|m| m.value))
}

pub(crate) async fn upsert_value<C>(conn: &C, key: &str, value: String) -> anyhow::Result<()>
where
    C: ConnectionTrait,
{
    let model = settings::ActiveModel {
        key: Set(key.to_owned()),
        value: Set(value),
        updated_at: Set(Local::now().naive_local()),
    };

    settings::Entity::insert(model)
        .on_conflict(
            OnConflict::column(settings::Column::Key)
                .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                .to_owned(),
        )
        .exec(conn)
        .await?;

    Ok(())
}

pub(crate) async fn session_count<C>(conn: &C) -> anyhow::Result<u64>
where
    C: ConnectionTrait,
{
    let count = get_value(conn, DatabaseHandler::SESSION_COUNTER_KEY)
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();

    Ok(count)
}

/// IR and RED are raw ADC counts and are kept as integers.
pub(crate) fn format_value(channel: Channel, value: f64) -> String {
    match channel {
        Channel::Ir | Channel::Red => format!("{}", value.round() as i64),
        Channel::Bpm | Channel::SpO2 => format!("{value:.2}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_value() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        assert_eq!(db.get_value("missing").await.unwrap(), None);

        db.set_value("patient", "Ada".into()).await.unwrap();
        db.set_value("patient", "Grace".into()).await.unwrap();
        assert_eq!(db.get_value("patient").await.unwrap(), Some("Grace".into()));
    }

    #[tokio::test]
    async fn last_values_round_trip() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        assert_eq!(db.last_values().await.unwrap(), LastValues::default());

        let last = LastValues {
            bpm: Some(72.0),
            spo2: Some(97.5),
            ir: Some(61_234.4),
            red: None,
        };
        db.store_last_values(&last).await.unwrap();

        let stored = db.last_values().await.unwrap();
        assert_eq!(stored.bpm, Some(72.0));
        assert_eq!(stored.spo2, Some(97.5));
        assert_eq!(stored.ir, Some(61_234.0));
        assert_eq!(stored.red, None);
        assert_eq!(
            db.get_value("last_ir_value").await.unwrap(),
            Some("61234".into())
        );
    }

    #[tokio::test]
    async fn session_count_starts_at_zero() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        assert_eq!(db.session_count().await.unwrap(), 0);

        db.set_value(DatabaseHandler::SESSION_COUNTER_KEY, "garbage".into())
            .await
            .unwrap();
        assert_eq!(db.session_count().await.unwrap(), 0);
    }
}
