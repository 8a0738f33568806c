use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use super::error::EngineError;
use super::types::ExecOutput;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run an engine client process to completion, logging its output line by
/// line as it arrives.
///
/// stdout and stderr are interleaved into [`ExecOutput::output`] in arrival
/// order. With a `timeout`, the client is killed once it elapses and
/// [`EngineError::Timeout`] is returned.
pub fn run_streaming(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<ExecOutput, EngineError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EngineError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let log_buf = Arc::new(Mutex::new(String::new()));

    let readers: Vec<JoinHandle<()>> = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
    ]
    .into_iter()
    .flatten()
    .map(|stream| spawn_reader(stream, Arc::clone(&log_buf)))
    .collect();

    let start = Instant::now();
    let mut timed_out = false;

    let exit_status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => {
                terminate(&mut child);
                break None;
            }
        }

        if let Some(limit) = timeout
            && start.elapsed() > limit
        {
            timed_out = true;
            terminate(&mut child);
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    for handle in readers {
        let _ = handle.join();
    }

    if timed_out {
        return Err(EngineError::Timeout(timeout.unwrap_or_default()));
    }

    let output = log_buf.lock().map(|b| b.clone()).unwrap_or_default();
    Ok(ExecOutput {
        exit_code: exit_status.and_then(|s| s.code()),
        output,
    })
}

/// Kill and reap the client so the reader threads see EOF.
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader(stream: Box<dyn Read + Send>, buf: Arc<Mutex<String>>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut raw = Vec::new();
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
            // Output is not guaranteed to be UTF-8; keep reading past bad bytes.
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\n', '\r']);
            debug!(target: "dkcompose::exec", "{line}");
            if let Ok(mut buf) = buf.lock() {
                buf.push_str(line);
                buf.push('\n');
            }
        }
    })
}
