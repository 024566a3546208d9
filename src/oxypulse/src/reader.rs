use oxypulse_codec::{LineFramer, RawSample};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::DeviceConnection;

/// The task that owns an open connection and forwards parsed samples.
///
/// It selects between a stop signal and the pending read, and closes the
/// connection once, after its loop exits. The task resolves to the reason it
/// ended on its own, or `None` when it was stopped.
pub(crate) struct ReadTask {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Option<String>>,
    finished: bool,
}

impl ReadTask {
    pub fn spawn<C>(connection: C, samples: mpsc::Sender<RawSample>, max_line: usize) -> Self
    where
        C: DeviceConnection,
    {
        let (stop, stopped) = oneshot::channel();
        let handle = tokio::spawn(read_loop(connection, stopped, samples, max_line));

        Self {
            stop: Some(stop),
            handle,
            finished: false,
        }
    }

    /// Resolves once the task ended without being asked to.
    pub async fn finished(&mut self) -> String {
        if self.finished {
            return std::future::pending().await;
        }

        let outcome = (&mut self.handle).await;
        self.finished = true;

        match outcome {
            Ok(Some(reason)) => reason,
            Ok(None) => "read loop stopped".to_owned(),
            Err(error) => error.to_string(),
        }
    }

    /// Stops the loop and waits until the connection is closed.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }

        if self.finished {
            return;
        }

        if let Err(error) = self.handle.await {
            error!("Read task failed: {}", error);
        }
    }
}

async fn read_loop<C>(
    mut connection: C,
    mut stop: oneshot::Receiver<()>,
    samples: mpsc::Sender<RawSample>,
    max_line: usize,
) -> Option<String>
where
    C: DeviceConnection,
{
    let mut framer = LineFramer::with_max_line(max_line);
    let mut buf = [0u8; 512];

    let outcome = 'read: loop {
        let read = tokio::select! {
            biased;
            _ = &mut stop => break None,
            read = connection.read(&mut buf) => read,
        };

        let len = match read {
            Ok(0) => break Some("device closed the stream".to_owned()),
            Ok(len) => len,
            Err(error) => break Some(error.to_string()),
        };
        trace!("rx {}", hex::encode(&buf[..len]));

        for line in framer.feed(&buf[..len]) {
            let sample = RawSample::parse(&line);
            if sample.is_empty() {
                trace!("Ignored line: {:?}", line);
                continue;
            }

            tokio::select! {
                biased;
                _ = &mut stop => break 'read None,
                sent = samples.send(sample) => {
                    if sent.is_err() {
                        break 'read None;
                    }
                }
            }
        }
    };

    if framer.pending() > 0 {
        debug!("Dropped {} bytes of an unterminated line", framer.pending());
    }
    if framer.discarded_bytes() > 0 {
        debug!("Dropped {} bytes of oversized lines", framer.discarded_bytes());
    }

    connection.close().await;
    outcome
}
