#[macro_use]
extern crate log;

use std::{io, time::Duration};

use anyhow::anyhow;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use dotenv::dotenv;
use oxypulse::{
    DatabaseHandler, MemoryStore, SearchSessions, SerialTransport, SessionConfig,
    SessionController, SessionStore, SimulatedTransport, Transport, list_ports,
};

mod console;
use console::ConsoleObserver;

#[derive(Parser)]
#[command(name = "oxypulse")]
pub struct OxyPulseCli {
    #[arg(env, long)]
    pub database_url: Option<String>,
    #[command(flatten)]
    pub session: SessionArgs,
    #[clap(subcommand)]
    pub subcommand: OxyPulseCommand,
}

#[derive(Args)]
pub struct SessionArgs {
    #[arg(env, long, default_value_t = SessionConfig::BAUD_RATE)]
    pub baud_rate: u32,
    #[arg(
        env,
        long,
        default_value_t = SessionConfig::AUTO_STOP.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..=86_400)
    )]
    pub auto_stop_secs: u64,
    #[arg(
        env,
        long,
        default_value_t = SessionConfig::GRACE.as_secs(),
        value_parser = clap::value_parser!(u64).range(0..=86_400)
    )]
    pub grace_secs: u64,
    #[arg(env, long)]
    pub count_empty_sessions: bool,
}

impl From<&SessionArgs> for SessionConfig {
    fn from(args: &SessionArgs) -> Self {
        Self {
            baud_rate: args.baud_rate,
            auto_stop: Duration::from_secs(args.auto_stop_secs),
            grace: Duration::from_secs(args.grace_secs),
            count_empty_sessions: args.count_empty_sessions,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum OxyPulseCommand {
    ///
    /// List serial ports
    ///
    Ports,
    ///
    /// Run a monitoring session against a sensor on a serial port
    ///
    Monitor {
        #[arg(long, env = "SERIAL_PORT")]
        port: String,
    },
    ///
    /// Run a monitoring session against simulated readings
    ///
    Simulate {
        /// Seconds after which the simulated finger leaves the sensor
        #[arg(long)]
        remove_finger_after: Option<u64>,
        /// Make opening the simulated device fail
        #[arg(long)]
        fail_open: bool,
        #[arg(long)]
        seed: Option<u64>,
    },
    ///
    /// Print the session counter and the most recent stored sessions
    ///
    Sessions {
        #[arg(long, default_value_t = 10)]
        limit: u64,
    },
    ///
    /// Generate shell completions
    ///
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(error) = dotenv() {
        println!("{}", error);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("sqlx::query", log::LevelFilter::Off)
        .filter_module("sea_orm_migration::migrator", log::LevelFilter::Off)
        .init();

    let cli = OxyPulseCli::parse();
    let config = SessionConfig::from(&cli.session);

    match cli.subcommand {
        OxyPulseCommand::Ports => {
            let ports = list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found");
            }

            for port in ports {
                println!("{}\t{}", port.name, port.description);
            }

            Ok(())
        }
        OxyPulseCommand::Monitor { port } => {
            run_session(SerialTransport::new(port), cli.database_url, config).await
        }
        OxyPulseCommand::Simulate {
            remove_finger_after,
            fail_open,
            seed,
        } => {
            let mut transport = SimulatedTransport::default()
                .remove_finger_after(remove_finger_after.map(Duration::from_secs))
                .fail_open(fail_open);
            if let Some(seed) = seed {
                transport = transport.with_seed(seed);
            }

            run_session(transport, cli.database_url, config).await
        }
        OxyPulseCommand::Sessions { limit } => {
            let database_url = cli
                .database_url
                .ok_or(anyhow!("DATABASE_URL is required to read sessions"))?;
            let db = DatabaseHandler::new(database_url).await?;

            println!("Sessions recorded: {}", db.session_count().await?);
            let sessions = db
                .search_sessions(SearchSessions {
                    limit: Some(limit),
                    ..Default::default()
                })
                .await?;

            for stored in sessions {
                println!("\n#{} {}", stored.number, stored.report);
            }

            Ok(())
        }
        OxyPulseCommand::Completions { shell } => {
            let mut command = OxyPulseCli::command();
            generate(shell, &mut command, "oxypulse", &mut io::stdout());
            Ok(())
        }
    }
}

async fn run_session<T>(
    transport: T,
    database_url: Option<String>,
    config: SessionConfig,
) -> anyhow::Result<()>
where
    T: Transport,
{
    match database_url {
        Some(database_url) => {
            let db = DatabaseHandler::new(database_url).await?;
            monitor(transport, db, config).await
        }
        None => {
            warn!("DATABASE_URL is not set, the session will not be persisted");
            monitor(transport, MemoryStore::default(), config).await
        }
    }
}

async fn monitor<T, S>(transport: T, store: S, config: SessionConfig) -> anyhow::Result<()>
where
    T: Transport,
    S: SessionStore,
{
    let handle = SessionController::spawn(transport, ConsoleObserver::default(), store, config);

    let interrupt = handle.clone();
    ctrlc::set_handler(move || {
        if let Err(error) = interrupt.request_disconnect() {
            error!("{}", error);
        }
    })?;

    let connected = handle.connect().await;
    let status = match connected {
        Ok(()) => handle.settled().await?,
        Err(_) => handle.status(),
    };
    handle.shutdown().await?;

    match status.error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}
