use std::{future::Future, pin::Pin, sync::Arc};

use chrono::Local;
use oxypulse_algos::{HistoryLog, SessionStats, SignalValidator};
use oxypulse_codec::RawSample;
use oxypulse_types::{
    Channel, Countdown, FingerState, LastValues, SessionReport, SessionState, Termination,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until, timeout},
};
use uuid::Uuid;

use crate::{
    ConnectionError, Notice, SessionConfig, SessionError, SessionObserver, SessionStore,
    Transport, reader::ReadTask, store::StoreWorker,
};

const FINGER_CHECK_NOTICE: &str =
    "Finger position monitoring activated. Please keep your finger in place.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    /// Kept until the next transition out of `Error` or a dismiss.
    pub error: Option<String>,
}

enum Command {
    Connect(oneshot::Sender<Result<(), SessionError>>),
    Disconnect(Option<oneshot::Sender<Option<SessionReport>>>),
    Dismiss(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front end of a running [`SessionController`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::ControllerGone)
    }

    /// Opens the device and starts monitoring. Returns once monitoring runs.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect(reply))?;
        rx.await.map_err(|_| SessionError::ControllerGone)?
    }

    /// Ends the running session. `None` when nothing was being monitored.
    pub async fn disconnect(&self) -> Result<Option<SessionReport>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Disconnect(Some(reply)))?;
        rx.await.map_err(|_| SessionError::ControllerGone)
    }

    /// Queues a disconnect without waiting, for use from signal handlers.
    pub fn request_disconnect(&self) -> Result<(), SessionError> {
        self.send(Command::Disconnect(None))
    }

    /// Clears an error report and returns to `Idle`.
    pub async fn dismiss(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Dismiss(reply))?;
        rx.await.map_err(|_| SessionError::ControllerGone)
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    /// Waits until no session is running and returns the resulting status.
    pub async fn settled(&self) -> Result<SessionStatus, SessionError> {
        let mut status = self.status.clone();
        let settled = status
            .wait_for(|status| status.state.accepts_connect())
            .await
            .map_err(|_| SessionError::ControllerGone)?
            .clone();

        Ok(settled)
    }

    /// Ends any running session, flushes pending store writes and stops the
    /// controller.
    pub async fn shutdown(self) -> Result<(), SessionError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Shutdown(done))?;
        rx.await.map_err(|_| SessionError::ControllerGone)
    }
}

enum SessionEvent {
    AutoStop,
    GraceElapsed,
    Tick,
    Sample(RawSample),
    ReaderEnded(String),
}

type OpenFuture<C> = Pin<Box<dyn Future<Output = Result<C, ConnectionError>> + Send>>;

/// A device open in flight and the caller waiting on it.
struct PendingOpen<C> {
    open: OpenFuture<C>,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

async fn opened<C>(pending: &mut Option<PendingOpen<C>>) -> Result<C, ConnectionError> {
    match pending {
        Some(pending) => pending.open.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Everything that lives only while monitoring.
struct ActiveSession {
    id: Uuid,
    started: Instant,
    stats: SessionStats,
    history: HistoryLog,
    reader: ReadTask,
    samples: mpsc::Receiver<RawSample>,
    deadline: Instant,
    grace_until: Instant,
    finger_check: bool,
    countdown: Countdown,
    ticker: Interval,
}

impl ActiveSession {
    fn new(reader: ReadTask, samples: mpsc::Receiver<RawSample>, config: &SessionConfig) -> Self {
        let now = Instant::now();
        let mut ticker = interval_at(now + config.tick, config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            id: Uuid::new_v4(),
            started: now,
            stats: SessionStats::new(Local::now().naive_local()),
            history: HistoryLog::default(),
            reader,
            samples,
            deadline: now + config.auto_stop,
            grace_until: now + config.grace,
            finger_check: false,
            countdown: Countdown::new(config.countdown_secs()),
            ticker,
        }
    }

    async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            biased;
            _ = sleep_until(self.deadline) => SessionEvent::AutoStop,
            _ = sleep_until(self.grace_until), if !self.finger_check => SessionEvent::GraceElapsed,
            _ = self.ticker.tick(), if !self.countdown.is_finished() => SessionEvent::Tick,
            Some(sample) = self.samples.recv() => SessionEvent::Sample(sample),
            reason = self.reader.finished() => SessionEvent::ReaderEnded(reason),
        }
    }
}

async fn next_event(active: &mut Option<ActiveSession>) -> SessionEvent {
    match active {
        Some(active) => active.next_event().await,
        None => std::future::pending().await,
    }
}

/// Owns the session state machine. Every transition happens on the
/// controller task, one command or timer event at a time.
pub struct SessionController<T: Transport, O> {
    transport: Arc<T>,
    observer: O,
    config: SessionConfig,
    store: StoreWorker,
    status: watch::Sender<SessionStatus>,
    last_values: LastValues,
    opening: Option<PendingOpen<T::Connection>>,
    active: Option<ActiveSession>,
}

impl<T, O> SessionController<T, O>
where
    T: Transport,
    O: SessionObserver,
{
    pub fn spawn<S>(transport: T, observer: O, store: S, config: SessionConfig) -> SessionHandle
    where
        S: SessionStore,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(SessionStatus::default());

        tokio::spawn(async move {
            let last_values = match store.load_last_values().await {
                Ok(last_values) => last_values,
                Err(error) => {
                    error!("Failed to load last values: {}", error);
                    LastValues::default()
                }
            };

            let controller = Self {
                transport: Arc::new(transport),
                observer,
                config: config.clamped(),
                store: StoreWorker::spawn(store),
                status,
                last_values,
                opening: None,
                active: None,
            };
            controller.run(rx).await;
        });

        SessionHandle {
            commands,
            status: status_rx,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let done = loop {
            tokio::select! {
                biased;
                command = commands.recv() => {
                    let Some(command) = command else {
                        break None;
                    };

                    match command {
                        Command::Connect(reply) => self.connect(reply),
                        Command::Disconnect(reply) => {
                            let report = self.finish(Termination::Requested).await;
                            if report.is_none() {
                                debug!("Nothing to disconnect in {}", self.state());
                            }
                            if let Some(reply) = reply {
                                let _ = reply.send(report);
                            }
                        }
                        Command::Dismiss(reply) => {
                            self.dismiss();
                            let _ = reply.send(());
                        }
                        Command::Shutdown(done) => break Some(done),
                    }
                }
                result = opened(&mut self.opening) => self.on_opened(result),
                event = next_event(&mut self.active) => self.handle_event(event).await,
            }
        };

        if let Some(pending) = self.opening.take() {
            let _ = pending.reply.send(Err(SessionError::ControllerGone));
        }
        self.finish(Termination::Requested).await;
        self.store.close().await;
        info!("Session controller stopped");

        if let Some(done) = done {
            let _ = done.send(());
        }
    }

    fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    fn set_state(&mut self, state: SessionState, error: Option<String>) {
        info!("Session state: {}", state);
        let status = SessionStatus { state, error };
        self.observer.state(&status);
        self.status.send_replace(status);
    }

    /// Starts opening the device. The reply is sent once the open settles, or
    /// right away when a session is already underway.
    fn connect(&mut self, reply: oneshot::Sender<Result<(), SessionError>>) {
        let state = self.state();
        if state.is_busy() {
            debug!("Connect refused in {}", state);
            let _ = reply.send(Err(SessionError::Busy(state)));
            return;
        }

        self.set_state(SessionState::Connecting, None);
        info!("Connecting to {}", self.transport.name());

        let transport = self.transport.clone();
        let baud_rate = self.config.baud_rate;
        let open_timeout = self.config.open_timeout;
        let open = async move {
            timeout(open_timeout, transport.open(baud_rate))
                .await
                .unwrap_or_else(|_| Err(ConnectionError::Timeout(open_timeout)))
        };

        self.opening = Some(PendingOpen {
            open: Box::pin(open),
            reply,
        });
    }

    fn on_opened(&mut self, opened: Result<T::Connection, ConnectionError>) {
        let Some(PendingOpen { reply, .. }) = self.opening.take() else {
            return;
        };

        let result = match opened {
            Ok(connection) => {
                self.start(connection);
                Ok(())
            }
            Err(error) => {
                let message = format!("Connection failed: {error}");
                warn!("{}", message);
                self.observer.notice(&Notice::error(&message));
                self.set_state(SessionState::Error, Some(message));
                Err(error.into())
            }
        };
        let _ = reply.send(result);
    }

    fn start(&mut self, connection: T::Connection) {
        let (tx, samples) = mpsc::channel(self.config.sample_buffer);
        let reader = ReadTask::spawn(connection, tx, self.config.max_line_len);

        let active = ActiveSession::new(reader, samples, &self.config);
        let countdown = active.countdown;
        info!(
            "Monitoring session {} for {:?}",
            active.id, self.config.auto_stop
        );

        self.active = Some(active);
        self.set_state(SessionState::Monitoring, None);
        self.observer.countdown(countdown);
    }

    fn dismiss(&mut self) {
        if self.state() == SessionState::Error {
            self.set_state(SessionState::Idle, None);
        }
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AutoStop => {
                self.finish(Termination::AutoStop).await;
            }
            SessionEvent::GraceElapsed => {
                if let Some(active) = self.active.as_mut() {
                    active.finger_check = true;
                }
                debug!("Finger checks enabled");
                self.observer.notice(&Notice::info(FINGER_CHECK_NOTICE));
            }
            SessionEvent::Tick => {
                if let Some(active) = self.active.as_mut() {
                    active.countdown.tick();
                    self.observer.countdown(active.countdown);
                }
            }
            SessionEvent::Sample(sample) => self.on_sample(sample).await,
            SessionEvent::ReaderEnded(reason) => {
                warn!("Device connection lost: {}", reason);
                self.abort(Termination::DeviceLost(reason)).await;
            }
        }
    }

    async fn on_sample(&mut self, sample: RawSample) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let classification = SignalValidator::classify(sample);
        active.stats.update(&classification);
        active.history.record(
            &classification,
            Local::now().naive_local(),
            active.started.elapsed(),
        );

        let mut updated = false;
        for channel in Channel::ALL {
            if let Some(value) = classification.plausible(channel) {
                self.last_values.set(channel, value);
                updated = true;
            }
        }
        if updated {
            self.store.last_values(self.last_values);
        }

        self.observer.sample(&classification);

        if active.finger_check && classification.finger == FingerState::NoFinger {
            warn!("Finger removed during measurement");
            self.abort(Termination::FingerRemoved).await;
        }
    }

    /// Error path. The session's statistics are discarded.
    async fn abort(&mut self, termination: Termination) {
        let Some(active) = self.active.take() else {
            return;
        };

        self.set_state(SessionState::Terminating, None);
        active.reader.stop().await;

        let message = termination.message();
        info!("Session {} aborted: {}", active.id, termination);
        self.observer.notice(&Notice::error(&message));
        self.set_state(SessionState::Error, Some(message));
    }

    /// Normal path. Finalizes the statistics and hands the report on.
    async fn finish(&mut self, termination: Termination) -> Option<SessionReport> {
        let active = self.active.take()?;
        let ActiveSession {
            id,
            stats,
            history,
            reader,
            mut countdown,
            ..
        } = active;

        reader.stop().await;

        if termination == Termination::AutoStop {
            while !countdown.is_finished() {
                countdown.tick();
            }
            self.observer.countdown(countdown);
        }

        let report = SessionReport {
            id,
            started_at: stats.started_at(),
            ended_at: Local::now().naive_local(),
            samples: stats.samples(),
            averages: stats.finalize(),
            last_values: self.last_values,
            history: history.into_entries(),
            termination,
        };
        info!("Session {} ended: {}", id, report.termination);
        self.set_state(SessionState::Disconnected, None);

        if report.averages.is_empty() && !self.config.count_empty_sessions {
            warn!("Session {} produced no plausible reading, not counted", id);
            self.observer.notice(&Notice::warning(
                "No valid readings were received. The session was not saved.",
            ));
        } else {
            self.store.session(report.clone());
        }

        self.observer.notice(&Notice::info(report.termination.message()));
        self.observer.finished(&report);
        Some(report)
    }
}
