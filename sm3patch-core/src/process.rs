//! Child process execution with line-by-line output forwarding.
//!
//! stdout and stderr are drained on their own threads so a chatty child can
//! never block on a full pipe while we wait for it. A third thread waits for
//! the child itself: once it exits, output still in flight gets a short grace
//! period, after which readers held open by grandchildren are abandoned.

use crate::ports::{CommandOutcome, OutputStream, ProcessLine};
use anyhow::Context;
use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long output may keep arriving after the child has exited.
pub const OUTPUT_GRACE: Duration = Duration::from_millis(500);

enum Event {
    Line(ProcessLine),
    Exited(io::Result<ExitStatus>),
}

/// Run `cmd` to completion, calling `on_line` for every output line in arrival order.
///
/// There is no timeout on the child: a hung child blocks the caller.
pub fn run_streaming(
    cmd: &mut Command,
    on_line: &mut dyn FnMut(ProcessLine),
) -> anyhow::Result<CommandOutcome> {
    let cmd_line = format!("{:?}", cmd);
    debug!(command = %cmd_line, "spawning");

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn {cmd_line}"))?;

    let stdout = child.stdout.take().context("child stdout not captured")?;
    let stderr = child.stderr.take().context("child stderr not captured")?;

    let (tx, rx) = mpsc::channel();
    let readers = [
        spawn_reader(stdout, OutputStream::Stdout, tx.clone()),
        spawn_reader(stderr, OutputStream::Stderr, tx.clone()),
    ];
    spawn_waiter(child, tx);

    let mut status = None;
    let mut deadline: Option<Instant> = None;
    loop {
        let event = match deadline {
            None => match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(left) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        debug!(command = %cmd_line, "output still open after exit; not waiting");
                        break;
                    }
                }
            }
        };
        match event {
            Event::Line(line) => on_line(line),
            Event::Exited(result) => {
                status = Some(result.with_context(|| format!("wait for {cmd_line}"))?);
                deadline = Some(Instant::now() + OUTPUT_GRACE);
            }
        }
    }

    let status = status.with_context(|| format!("{cmd_line} exited without a status"))?;
    // Readers still blocked on a pipe inherited by a grandchild are left detached.
    for reader in readers {
        if reader.is_finished() && reader.join().is_err() {
            warn!(command = %cmd_line, "output reader panicked");
        }
    }
    debug!(command = %cmd_line, code = ?status.code(), "exited");

    Ok(CommandOutcome {
        exit_code: status.code(),
        success: status.success(),
    })
}

fn spawn_waiter(mut child: Child, tx: Sender<Event>) {
    thread::spawn(move || {
        let _ = tx.send(Event::Exited(child.wait()));
    });
}

fn spawn_reader<R>(reader: R, stream: OutputStream, tx: Sender<Event>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let text = text.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(Event::Line(ProcessLine { stream, text })).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "stopped reading child output");
                    break;
                }
            }
        }
    })
}
