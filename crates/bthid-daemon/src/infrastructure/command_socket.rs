//! The UNIX command socket: one line-delimited request per connection.
//!
//! The server thread accepts sequentially, reads a single command line,
//! executes it through [`commands::execute`], and writes the reply. A
//! SHUTDOWN command is acknowledged first and then forwarded to the daemon
//! through the shutdown channel. The client half of the protocol lives in
//! [`send_command`], used by the CLI subcommands.

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::application::commands::{self, HidControl};

/// Default command socket path of the classic daemon.
pub const SOCKET_PATH: &str = "/tmp/jadeai-bthid.sock";

// ── Server ────────────────────────────────────────────────────────────────────

pub struct CommandServer {
    path: PathBuf,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CommandServer {
    /// Binds the socket (replacing any stale file) and starts serving.
    pub fn start(
        path: &Path,
        hid: Arc<dyn HidControl>,
        shutdown_tx: Sender<()>,
    ) -> io::Result<Self> {
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path)?;
        info!(path = %path.display(), "command socket listening");

        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let thread = std::thread::spawn(move || serve(listener, hid, shutdown_tx, thread_running));

        Ok(Self {
            path: path.to_path_buf(),
            running,
            thread: Some(thread),
        })
    }

    /// Stops the server thread and removes the socket file. Idempotent.
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        // Wake the blocking accept with a throwaway connection.
        let _ = UnixStream::connect(&self.path);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve(
    listener: UnixListener,
    hid: Arc<dyn HidControl>,
    shutdown_tx: Sender<()>,
    running: Arc<AtomicBool>,
) {
    for stream in listener.incoming() {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => handle_client(stream, hid.as_ref(), &shutdown_tx),
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    warn!("error accepting command connection: {e}");
                }
            }
        }
    }
    debug!("command socket thread exiting");
}

fn handle_client(stream: UnixStream, hid: &dyn HidControl, shutdown_tx: &Sender<()>) {
    let mut line = String::new();
    {
        let mut reader = BufReader::new(&stream);
        match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                warn!("failed to read command: {e}");
                return;
            }
        }
    }

    let outcome = commands::execute(&line, hid);
    let mut writer = &stream;
    if let Err(e) = writeln!(writer, "{}", outcome.response) {
        warn!("failed to send response: {e}");
    }
    if outcome.shutdown {
        let _ = shutdown_tx.send(());
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Reply from a running daemon, classified by its `OK`/`ERR` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientReply {
    pub ok: bool,
    pub payload: String,
}

/// Sends one command line to the daemon and parses the reply.
pub fn send_command(path: &Path, line: &str) -> io::Result<ClientReply> {
    let mut stream = UnixStream::connect(path)?;
    stream.write_all(line.as_bytes())?;
    stream.write_all(b"\n")?;

    let mut reply = String::new();
    let mut reader = BufReader::new(&stream);
    reader.read_line(&mut reply)?;
    let reply = reply.trim_end_matches(['\r', '\n']);
    if reply.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no response from daemon",
        ));
    }

    Ok(parse_reply(reply))
}

fn parse_reply(reply: &str) -> ClientReply {
    if let Some(rest) = reply.strip_prefix("OK") {
        ClientReply {
            ok: true,
            payload: rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        }
    } else if let Some(rest) = reply.strip_prefix("ERR") {
        ClientReply {
            ok: false,
            payload: rest.strip_prefix(' ').unwrap_or(rest).to_string(),
        }
    } else {
        // Unknown prefix: hand the raw line back as a success payload.
        ClientReply {
            ok: true,
            payload: reply.to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
