#[macro_use]
extern crate log;

mod config;
pub use config::SessionConfig;

mod error;
pub use error::{ConnectionError, SessionError};

mod transport;
pub use transport::{
    DeviceConnection, PortInfo, SerialConnection, SerialTransport, Transport, list_ports,
};

mod simulator;
pub use simulator::{SimulatedConnection, SimulatedTransport};

mod reader;

mod observer;
pub use observer::{Notice, NoticeLevel, SessionObserver};

mod store;
pub use store::{MemoryStore, SessionStore};

mod session;
pub use session::{SessionController, SessionHandle, SessionStatus};

pub use oxypulse_db::{DatabaseHandler, SearchSessions, StoredSession};
