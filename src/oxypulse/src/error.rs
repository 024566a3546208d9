use std::time::Duration;

use oxypulse_types::SessionState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },
    #[error("failed to list serial ports: {0}")]
    Ports(#[source] tokio_serial::Error),
    #[error("device did not open within {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("controller is busy ({0})")]
    Busy(SessionState),
    #[error("session controller is no longer running")]
    ControllerGone,
}
