pub mod channels;
pub mod history;
pub mod session;

pub use channels::{Channel, FingerState, LastValues};
pub use history::{ContactStatus, HistoryEntry};
pub use session::{
    ChannelAverage, Countdown, SessionAverages, SessionReport, SessionState, Termination,
};
