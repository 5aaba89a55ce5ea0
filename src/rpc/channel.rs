use super::server::WorkerServer;
use super::RpcError;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A bidirectional, newline-delimited message channel to a worker.
pub trait LineChannel {
    fn send_line(&mut self, line: &str) -> Result<(), RpcError>;

    /// `Ok(None)` means the worker side has closed the channel.
    fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, RpcError>;

    fn close(&mut self);
}

pub struct ProcessChannel {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Receiver<std::io::Result<String>>,
    reader: Option<JoinHandle<()>>,
}

impl ProcessChannel {
    pub fn spawn(binary: &Path, workspace: &Path) -> Result<Self, RpcError> {
        let mut command = Command::new(binary);
        command.arg("--workspace").arg(workspace);
        Self::spawn_command(command)
    }

    pub fn spawn_command(mut command: Command) -> Result<Self, RpcError> {
        let program = command.get_program().to_string_lossy().to_string();
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = command.spawn().map_err(|source| RpcError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| RpcError::Io {
            context: "spawn".to_string(),
            source: std::io::Error::other("missing stdout pipe"),
        })?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let stop = line.is_err();
                if tx.send(line).is_err() || stop {
                    break;
                }
            }
        });

        Ok(Self {
            program,
            child,
            stdin,
            lines: rx,
            reader: Some(reader),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl LineChannel for ProcessChannel {
    fn send_line(&mut self, line: &str) -> Result<(), RpcError> {
        let stdin = self.stdin.as_mut().ok_or(RpcError::ChannelClosed)?;
        writeln!(stdin, "{line}")
            .and_then(|_| stdin.flush())
            .map_err(|source| RpcError::Io {
                context: "send".to_string(),
                source,
            })
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, RpcError> {
        match self.lines.recv_timeout(timeout) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(source)) => Err(RpcError::Io {
                context: "receive".to_string(),
                source,
            }),
            Err(RecvTimeoutError::Timeout) => Err(RpcError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn close(&mut self) {
        drop(self.stdin.take());
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs a worker on a thread of this process. Messages still cross the
/// boundary as serialized lines.
pub struct LocalChannel {
    to_worker: Option<Sender<String>>,
    from_worker: Receiver<String>,
    worker: Option<JoinHandle<()>>,
}

impl LocalChannel {
    pub fn spawn(server: WorkerServer) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (response_tx, response_rx) = mpsc::channel::<String>();
        let worker = thread::spawn(move || {
            for line in request_rx {
                let Some(response) = server.handle_line(&line) else {
                    continue;
                };
                if response_tx.send(response).is_err() {
                    break;
                }
            }
        });
        Self {
            to_worker: Some(request_tx),
            from_worker: response_rx,
            worker: Some(worker),
        }
    }
}

impl LineChannel for LocalChannel {
    fn send_line(&mut self, line: &str) -> Result<(), RpcError> {
        self.to_worker
            .as_ref()
            .ok_or(RpcError::ChannelClosed)?
            .send(line.to_string())
            .map_err(|_| RpcError::ChannelClosed)
    }

    fn recv_line(&mut self, timeout: Duration) -> Result<Option<String>, RpcError> {
        match self.from_worker.recv_timeout(timeout) {
            Ok(line) => Ok(Some(line)),
            Err(RecvTimeoutError::Timeout) => Err(RpcError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn close(&mut self) {
        drop(self.to_worker.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.close();
    }
}
