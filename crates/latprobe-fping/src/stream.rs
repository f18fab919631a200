use crate::error::ProbeError;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Lines of a child's stdout and stderr, interleaved in arrival order.
///
/// Reading blocks until the child writes a line or closes both streams. The
/// iterator ends once both streams are closed; the child is reaped then, or
/// killed and reaped if the iterator is dropped early.
pub struct OutputLines {
    child: Child,
    lines: Receiver<String>,
    pumps: Vec<JoinHandle<()>>,
    status: Option<ExitStatus>,
}

pub fn spawn_lines(program: &Path, args: &[String]) -> Result<OutputLines, ProbeError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProbeError::Spawn {
            program: program.display().to_string(),
            source,
        })?;

    let (tx, rx) = mpsc::channel();
    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(pump("stdout", stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(pump("stderr", stderr, tx));
    }

    Ok(OutputLines {
        child,
        lines: rx,
        pumps,
        status: None,
    })
}

fn pump<R: Read + Send + 'static>(
    name: &'static str,
    stream: R,
    tx: Sender<String>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\r', '\n']).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(stream = name, error = %err, "failed to read child output");
                    break;
                }
            }
        }
    })
}

impl OutputLines {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Exit status, known once the iterator has been drained.
    pub fn status(&self) -> Option<ExitStatus> {
        self.status
    }

    fn reap(&mut self) {
        for pump in self.pumps.drain(..) {
            let _ = pump.join();
        }
        match self.child.wait() {
            Ok(status) => self.status = Some(status),
            Err(err) => tracing::warn!(pid = self.child.id(), error = %err, "failed to reap child"),
        }
    }
}

impl Iterator for OutputLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.status.is_some() {
            return None;
        }
        match self.lines.recv() {
            Ok(line) => Some(line),
            Err(_) => {
                self.reap();
                None
            }
        }
    }
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        if self.status.is_some() {
            return;
        }
        if let Ok(Some(status)) = self.child.try_wait() {
            self.status = Some(status);
            return;
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
        // Pumps are not joined here: a grandchild may still hold the pipes
        // open. They exit on EOF or once the receiver is gone.
    }
}
