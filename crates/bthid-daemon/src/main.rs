//! JadeAI HID daemon entry point.
//!
//! `jadeai-bthid --daemon` runs the service: it binds the L2CAP channel
//! pair, starts the HID session server, and serves the UNIX command socket
//! until SIGINT/SIGTERM or a SHUTDOWN command. Every other invocation is a
//! thin client that forwards one command to the running daemon and exits 0
//! on `OK`, 1 on `ERR` or a transport failure.
//!
//! ```text
//! jadeai-bthid --daemon
//! jadeai-bthid type "Hello, world!"
//! jadeai-bthid move 40 -10
//! jadeai-bthid click left
//! jadeai-bthid status
//! jadeai-bthid sdp-record > /tmp/jadeai-hid-record.xml
//! jadeai-bthid shutdown
//! ```
//!
//! Adapter bring-up (power, name, class, discoverability) and SDP record
//! publication are the hosting system's responsibility; `sdp-record`
//! prints the record for it.

use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use bthid_core::engine::SafetyLimits;
use bthid_core::server::{EmitterConfig, HidServer};

use bthid_daemon::application::commands::encode_escapes;
use bthid_daemon::application::service::HidService;
use bthid_daemon::infrastructure::command_socket::{self, CommandServer, SOCKET_PATH};
use bthid_daemon::infrastructure::l2cap::L2capTransport;
use bthid_daemon::infrastructure::sdp;

// ── CLI ───────────────────────────────────────────────────────────────────────

/// Bluetooth HID keyboard/mouse daemon and control client.
#[derive(Parser)]
#[command(name = "jadeai-bthid", version, about)]
struct Cli {
    /// Run the HID daemon in the foreground.
    #[arg(long)]
    daemon: bool,

    #[command(subcommand)]
    command: Option<ClientCommand>,
}

#[derive(Subcommand)]
enum ClientCommand {
    /// Type text on the connected host.
    Type {
        /// Words to type; joined with single spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Move the pointer by a relative delta, optionally scrolling.
    #[command(allow_negative_numbers = true)]
    Move {
        dx: i32,
        dy: i32,
        wheel: Option<i32>,
    },
    /// Click a pointer button (left|right|middle|button1|button2|button3).
    Click { button: String },
    /// Query the daemon's connection status.
    Status,
    /// Print the SDP service record XML for registration with BlueZ.
    SdpRecord,
    /// Ask a running daemon to exit.
    Shutdown,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.daemon {
        return match run_daemon() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("fatal error: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    match cli.command {
        Some(command) => run_client(command),
        None => {
            eprintln!("Usage: jadeai-bthid --daemon | type <text…> | move <dx> <dy> [wheel] | click <button> | status | sdp-record | shutdown");
            ExitCode::FAILURE
        }
    }
}

// ── Daemon ────────────────────────────────────────────────────────────────────

static SIGNAL_SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signal: libc::c_int) {
    SIGNAL_SHUTDOWN.store(true, Ordering::SeqCst);
}

fn run_daemon() -> anyhow::Result<()> {
    info!("starting JadeAI HID daemon");

    let transport = L2capTransport::bind().context("failed to set up L2CAP transport")?;
    debug!(
        record_bytes = sdp::service_record_xml().len(),
        "SDP service record prepared"
    );

    let server = Arc::new(HidServer::start(transport, EmitterConfig::default()));
    let service = Arc::new(HidService::new(Arc::clone(&server), SafetyLimits::classic()));

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let mut command_server =
        CommandServer::start(Path::new(SOCKET_PATH), service, shutdown_tx)
            .context("failed to start command socket")?;

    let handler = on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
    unsafe {
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }

    info!("daemon ready; waiting for a host to connect");
    loop {
        if SIGNAL_SHUTDOWN.load(Ordering::SeqCst) {
            info!("shutdown signal received");
            break;
        }
        match shutdown_rx.recv_timeout(Duration::from_millis(250)) {
            Ok(()) => {
                info!("shutdown requested over command socket");
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    command_server.stop();
    server.stop();
    info!("daemon stopped");
    Ok(())
}

// ── Client ────────────────────────────────────────────────────────────────────

fn run_client(command: ClientCommand) -> ExitCode {
    let line = match command {
        ClientCommand::Type { text } => {
            format!("TYPE {}", encode_escapes(&text.join(" ")))
        }
        ClientCommand::Move { dx, dy, wheel } => match wheel {
            Some(wheel) => format!("MOVE {dx} {dy} {wheel}"),
            None => format!("MOVE {dx} {dy}"),
        },
        ClientCommand::Click { button } => format!("CLICK {button}"),
        ClientCommand::Status => "STATUS".to_string(),
        ClientCommand::Shutdown => "SHUTDOWN".to_string(),
        ClientCommand::SdpRecord => {
            print!("{}", sdp::service_record_xml());
            return ExitCode::SUCCESS;
        }
    };

    match command_socket::send_command(Path::new(SOCKET_PATH), &line) {
        Ok(reply) if reply.ok => {
            if !reply.payload.is_empty() {
                println!("{}", reply.payload);
            }
            ExitCode::SUCCESS
        }
        Ok(reply) => {
            eprintln!("{}", reply.payload);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Unable to reach the HID daemon: {e}");
            ExitCode::FAILURE
        }
    }
}
