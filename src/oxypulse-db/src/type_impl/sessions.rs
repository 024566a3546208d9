use chrono::NaiveDateTime;
use oxypulse_entities::sessions;
use oxypulse_types::{
    Channel, ChannelAverage, LastValues, SessionAverages, SessionReport, Termination,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};

use crate::{
    DatabaseHandler,
    db::{format_value, session_count, upsert_value},
};

#[derive(Default, Debug)]
pub struct SearchSessions {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
    pub limit: Option<u64>,
}

impl SearchSessions {
    pub(crate) fn conditions(self) -> Condition {
        Condition::all()
            .add_option(self.from.map(|from| sessions::Column::StartedAt.gte(from)))
            .add_option(self.to.map(|to| sessions::Column::StartedAt.lt(to)))
    }
}

/// A finished session read back from storage. Last values are not part of
/// the row and come back empty.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub number: u64,
    pub report: SessionReport,
}

impl DatabaseHandler {
    /// Bumps the session counter, records the averages of this session as
    /// the latest ones and inserts the session row, all in one transaction.
    /// Returns the new session number.
    pub async fn store_session(&self, report: &SessionReport) -> anyhow::Result<u64> {
        let txn = self.db.begin().await?;

        let number = session_count(&txn).await? + 1;
        upsert_value(&txn, Self::SESSION_COUNTER_KEY, number.to_string()).await?;

        for channel in Channel::ALL {
            if let Some(value) = report.average_or_last(channel) {
                upsert_value(&txn, channel.average_key(), format_value(channel, value)).await?;
            }
        }

        let averages = &report.averages;
        sessions::ActiveModel {
            id: Set(report.id),
            number: Set(number as i64),
            started_at: Set(report.started_at),
            ended_at: Set(report.ended_at),
            termination: Set(serde_json::to_string(&report.termination)?),
            samples: Set(report.samples as i64),
            avg_bpm: Set(averages.bpm.mean()),
            bpm_count: Set(averages.bpm.count as i64),
            avg_spo2: Set(averages.spo2.mean()),
            spo2_count: Set(averages.spo2.count as i64),
            avg_ir: Set(averages.ir.mean()),
            ir_count: Set(averages.ir.count as i64),
            avg_red: Set(averages.red.mean()),
            red_count: Set(averages.red.count as i64),
            history: Set(serde_json::to_value(&report.history)?),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(number)
    }

    /// Most recent sessions first.
    pub async fn search_sessions(
        &self,
        options: SearchSessions,
    ) -> anyhow::Result<Vec<StoredSession>> {
        let limit = options.limit;
        sessions::Entity::find()
            .filter(options.conditions())
            .order_by_desc(sessions::Column::Number)
            .limit(limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Self::parse_session)
            .collect()
    }

    fn parse_session(model: sessions::Model) -> anyhow::Result<StoredSession> {
        let termination: Termination = serde_json::from_str(&model.termination)?;

        Ok(StoredSession {
            number: model.number.try_into().unwrap_or_default(),
            report: SessionReport {
                id: model.id,
                started_at: model.started_at,
                ended_at: model.ended_at,
                samples: model.samples.try_into().unwrap_or_default(),
                averages: SessionAverages {
                    bpm: channel_average(model.avg_bpm, model.bpm_count),
                    spo2: channel_average(model.avg_spo2, model.spo2_count),
                    ir: channel_average(model.avg_ir, model.ir_count),
                    red: channel_average(model.avg_red, model.red_count),
                },
                last_values: LastValues::default(),
                history: serde_json::from_value(model.history)?,
                termination,
            },
        })
    }
}

fn channel_average(mean: Option<f64>, count: i64) -> ChannelAverage {
    let count = u64::try_from(count).unwrap_or_default();
    ChannelAverage {
        sum: mean.unwrap_or_default() * count as f64,
        count,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};
    use oxypulse_types::{ContactStatus, HistoryEntry};
    use uuid::Uuid;

    use super::*;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn report(started_at: NaiveDateTime) -> SessionReport {
        let mut averages = SessionAverages::default();
        averages.bpm.add(70.0);
        averages.bpm.add(80.0);
        averages.ir.add(60_000.0);

        SessionReport {
            id: Uuid::new_v4(),
            started_at,
            ended_at: started_at + TimeDelta::seconds(12),
            samples: 40,
            averages,
            last_values: LastValues {
                spo2: Some(97.0),
                ..Default::default()
            },
            history: vec![HistoryEntry {
                time: started_at,
                offset_ms: 120,
                bpm: Some(70.0),
                spo2: None,
                status: ContactStatus::Good,
            }],
            termination: Termination::AutoStop,
        }
    }

    #[tokio::test]
    async fn store_session_increments_counter() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();

        assert_eq!(db.store_session(&report(start())).await.unwrap(), 1);
        assert_eq!(db.store_session(&report(start())).await.unwrap(), 2);
        assert_eq!(db.session_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn store_session_writes_latest_averages() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        db.store_session(&report(start())).await.unwrap();

        assert_eq!(db.get_value("avg_bpm").await.unwrap(), Some("75.00".into()));
        // no SpO2 average, falls back to the last reading
        assert_eq!(db.get_value("avg_spo2").await.unwrap(), Some("97.00".into()));
        assert_eq!(db.get_value("avg_ir").await.unwrap(), Some("60000".into()));
        assert_eq!(db.get_value("avg_red").await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_returns_newest_first() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        let first = report(start());
        let second = report(start() + TimeDelta::hours(1));
        db.store_session(&first).await.unwrap();
        db.store_session(&second).await.unwrap();

        let sessions = db.search_sessions(SearchSessions::default()).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].number, 2);
        assert_eq!(sessions[0].report.id, second.id);

        let stored = &sessions[1].report;
        assert_eq!(stored.averages.bpm.count, 2);
        assert_eq!(stored.averages.bpm.mean(), Some(75.0));
        assert_eq!(stored.averages.spo2.mean(), None);
        assert_eq!(stored.history, first.history);
        assert_eq!(stored.termination, Termination::AutoStop);
    }

    #[tokio::test]
    async fn search_filters_by_start() {
        let db = DatabaseHandler::new("sqlite::memory:").await.unwrap();
        db.store_session(&report(start())).await.unwrap();
        db.store_session(&report(start() + TimeDelta::days(1))).await.unwrap();

        let sessions = db
            .search_sessions(SearchSessions {
                from: Some(start() + TimeDelta::hours(1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].number, 2);

        let limited = db
            .search_sessions(SearchSessions {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }
}
