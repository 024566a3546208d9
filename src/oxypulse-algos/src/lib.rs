pub(crate) mod validator;
pub use validator::{Classification, SignalValidator};

pub(crate) mod aggregator;
pub use aggregator::SessionStats;

pub(crate) mod history;
pub use history::HistoryLog;
