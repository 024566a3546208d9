use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use oxypulse_db::DatabaseHandler;
use oxypulse_types::{LastValues, SessionReport};
use tokio::{sync::mpsc, task::JoinHandle};

/// Where readings and finished sessions end up.
pub trait SessionStore: Send + Sync + 'static {
    /// Readings kept from earlier runs, used as fallbacks.
    fn load_last_values(&self) -> impl Future<Output = anyhow::Result<LastValues>> + Send;

    fn store_last_values(
        &self,
        last: &LastValues,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Stores the session and returns its number.
    fn store_session(
        &self,
        report: &SessionReport,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

impl SessionStore for DatabaseHandler {
    async fn load_last_values(&self) -> anyhow::Result<LastValues> {
        self.last_values().await
    }

    async fn store_last_values(&self, last: &LastValues) -> anyhow::Result<()> {
        DatabaseHandler::store_last_values(self, last).await
    }

    async fn store_session(&self, report: &SessionReport) -> anyhow::Result<u64> {
        DatabaseHandler::store_session(self, report).await
    }
}

/// Keeps everything in memory. Used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    last_values: LastValues,
    sessions: Vec<SessionReport>,
}

impl MemoryStore {
    pub fn with_last_values(last_values: LastValues) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                last_values,
                sessions: Vec::new(),
            })),
        }
    }

    pub fn last_values(&self) -> LastValues {
        self.lock().last_values
    }

    pub fn session_count(&self) -> u64 {
        self.lock().sessions.len() as u64
    }

    pub fn sessions(&self) -> Vec<SessionReport> {
        self.lock().sessions.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemoryStore {
    async fn load_last_values(&self) -> anyhow::Result<LastValues> {
        Ok(self.last_values())
    }

    async fn store_last_values(&self, last: &LastValues) -> anyhow::Result<()> {
        self.lock().last_values = *last;
        Ok(())
    }

    async fn store_session(&self, report: &SessionReport) -> anyhow::Result<u64> {
        let mut state = self.lock();
        state.sessions.push(report.clone());
        Ok(state.sessions.len() as u64)
    }
}

enum StoreCommand {
    LastValues(LastValues),
    Session(Box<SessionReport>),
}

/// Runs store writes on their own task so the controller never waits on
/// storage. Failures are logged and dropped.
pub(crate) struct StoreWorker {
    commands: mpsc::UnboundedSender<StoreCommand>,
    handle: JoinHandle<()>,
}

impl StoreWorker {
    pub fn spawn<S: SessionStore>(store: S) -> Self {
        let (commands, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    StoreCommand::LastValues(last) => {
                        if let Err(error) = store.store_last_values(&last).await {
                            error!("Failed to store last values: {}", error);
                        }
                    }
                    StoreCommand::Session(report) => match store.store_session(&report).await {
                        Ok(number) => info!("Stored session #{}", number),
                        Err(error) => error!("Failed to store session {}: {}", report.id, error),
                    },
                }
            }
        });

        Self { commands, handle }
    }

    pub fn last_values(&self, last: LastValues) {
        self.send(StoreCommand::LastValues(last));
    }

    pub fn session(&self, report: SessionReport) {
        self.send(StoreCommand::Session(Box::new(report)));
    }

    fn send(&self, command: StoreCommand) {
        if self.commands.send(command).is_err() {
            error!("Store worker is gone, dropping write");
        }
    }

    /// Waits for every queued write to finish.
    pub async fn close(self) {
        drop(self.commands);
        if let Err(error) = self.handle.await {
            error!("Store worker failed: {}", error);
        }
    }
}
