mod cli;
mod config;
mod dispatch;
mod error;
mod log;
mod monitor;
mod net;
mod output;
mod request;
mod value;
mod write;

use crate::cli::{Action, ArgParser, Commands, RequestFlags};
use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::monitor::{Monitor, Outcome};
use crate::net::{DeviceSession, ModbusSession, SessionConfig};
use crate::output::Printer;
use crate::request::{RequestArgs, RequestSpec};
use crate::write::WriteSpec;

use anyhow::Context;
use clap::Parser;
use futures_util::FutureExt;
use std::io;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args = ArgParser::parse();

    let mut settings = match args.config.as_deref().map(Settings::read).transpose() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            eprintln!("{}", e);
            return -1;
        }
    };
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }
    if let Err(e) = log::init(&settings.logging) {
        eprintln!("{}", e);
        return -1;
    }

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create runtime. [{}]", e);
            return -1;
        }
    };
    match runtime.block_on(execute(args.command, &settings)) {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(inner) if inner.is_configuration() => {
                eprintln!("{}", inner);
                0
            }
            _ => {
                error!("{:#}", e);
                -1
            }
        },
    }
}

async fn execute(command: Commands, settings: &Settings) -> anyhow::Result<i32> {
    let (config, action) = match command {
        Commands::Rtu {
            config,
            session,
            action,
        } => (settings.rtu_session(&config, &session)?, action),
        Commands::Tcp {
            config,
            session,
            action,
        } => (settings.tcp_session(&config, &session)?, action),
    };

    match action {
        Action::Ping => ping(config).await,
        Action::Read { request, .. } => {
            let dispatcher = dispatcher(&request)?;
            read(config, dispatcher).await
        }
        Action::Write { target, values, .. } => {
            let spec = WriteSpec::new(
                target.selection(),
                target.data_type.as_deref(),
                target.offset,
                &values,
            )?;
            write(config, spec).await
        }
        Action::Monitor {
            request,
            repeat,
            seconds,
            ..
        } => {
            let dispatcher = dispatcher(&request)?;
            let period = settings.period(seconds)?;
            monitor(config, dispatcher, period, repeat).await
        }
    }
}

/// Validate the request flags before any I/O happens.
fn dispatcher(flags: &RequestFlags) -> Result<Dispatcher, Error> {
    let dispatcher = Dispatcher::new(RequestSpec::new(&RequestArgs::from(flags))?)?;
    for warning in dispatcher.spec().warnings() {
        warn!("{}", warning);
    }
    Ok(dispatcher)
}

async fn connected<S: DeviceSession + ?Sized>(session: &mut S) -> Result<(), Error> {
    if session.connect().await {
        Ok(())
    } else {
        session.disconnect().await;
        Err(Error::Connection(String::from("Device is not reachable")))
    }
}

/// Single read between connect and disconnect. Disconnects even when the read panics.
async fn read_once<S>(session: &mut S, dispatcher: &Dispatcher) -> Result<Vec<String>, Error>
where
    S: DeviceSession + ?Sized,
{
    connected(session).await?;
    let result = AssertUnwindSafe(dispatcher.execute(&mut *session, true))
        .catch_unwind()
        .await;
    session.disconnect().await;
    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

/// Single write between connect and disconnect. Disconnects even when the write panics.
async fn write_once<S>(session: &mut S, spec: &WriteSpec) -> Result<String, Error>
where
    S: DeviceSession + ?Sized,
{
    connected(session).await?;
    let result = AssertUnwindSafe(spec.execute(&mut *session))
        .catch_unwind()
        .await;
    session.disconnect().await;
    result.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}

async fn ping(config: SessionConfig) -> anyhow::Result<i32> {
    let mut session = ModbusSession::new(config.clone());
    let reachable = session.connect().await;
    session.disconnect().await;
    if reachable {
        println!("{} is reachable.", config);
        Ok(0)
    } else {
        println!("{} is not reachable.", config);
        Ok(1)
    }
}

async fn read(config: SessionConfig, dispatcher: Dispatcher) -> anyhow::Result<i32> {
    let mut session = ModbusSession::new(config.clone());
    let lines = read_once(&mut session, &dispatcher)
        .await
        .with_context(|| format!("Reading from {} failed", config))?;
    Printer::new(io::stdout().lock()).print(&lines)?;
    Ok(0)
}

async fn write(config: SessionConfig, spec: WriteSpec) -> anyhow::Result<i32> {
    let mut session = ModbusSession::new(config.clone());
    let line = write_once(&mut session, &spec)
        .await
        .with_context(|| format!("Writing to {} failed", config))?;
    println!("{}", line);
    Ok(0)
}

async fn monitor(
    config: SessionConfig,
    dispatcher: Dispatcher,
    period: std::time::Duration,
    repeat: u64,
) -> anyhow::Result<i32> {
    let token = CancellationToken::new();
    let mut session = ModbusSession::new(config.clone());
    let monitor = Monitor::new(period, repeat, token.clone());
    let handle = tokio::spawn(async move {
        let mut printer = Printer::with_timestamps(io::stdout());
        monitor.run(&mut session, &dispatcher, &mut printer).await
    });

    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                info!("Interrupt received, stopping.");
                token.cancel();
            }
            Err(e) => {
                warn!("Unable to listen for the interrupt signal. [{}]", e);
                token.cancelled().await;
            }
        },
        _ = token.cancelled() => {}
    }

    let report = handle.await.context("Monitor task failed")?;
    info!(
        "Monitor finished after {} iteration(s), {} failed.",
        report.iterations, report.failures
    );
    match report.outcome {
        Outcome::ConnectFailed => {
            Err(Error::Connection(format!("Unable to connect to {}", config)).into())
        }
        Outcome::Cancelled | Outcome::Exhausted => {
            println!("Monitoring cancelled.");
            Ok(0)
        }
    }
}
