// Scripted connector shared by the lifecycle and CLI tests.
// Every connect, release, sleep and read is recorded so tests can assert ordering.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::{self, Read, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use ttylink::{CancelToken, Connector, Error, Link, SerialConfig, Sleeper};

pub enum Step {
    Data(Vec<u8>),
    Eof,
    Fail(io::ErrorKind),
}

#[derive(Default)]
pub struct ScriptState {
    pub reads: VecDeque<Step>,
    /// Outcome of each connect call in order; `true` once exhausted.
    pub connect_results: VecDeque<bool>,
    pub connects: usize,
    pub open_links: usize,
    pub written: Vec<u8>,
    /// Accept at most this many bytes per write call.
    pub write_limit: Option<usize>,
    pub sleeps: Vec<Duration>,
    pub events: Vec<String>,
    /// Cancelled by `wait_readable` once `reads` is empty.
    pub cancel_when_drained: Option<CancelToken>,
}

#[derive(Clone, Default)]
pub struct Script(Arc<Mutex<ScriptState>>);

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.0.lock().unwrap()
    }

    pub fn push_read(&self, step: Step) -> &Self {
        self.state().reads.push_back(step);
        self
    }

    pub fn push_connect(&self, ok: bool) -> &Self {
        self.state().connect_results.push_back(ok);
        self
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector(self.clone())
    }

    pub fn sleeper(&self) -> RecordingSleeper {
        RecordingSleeper(self.clone())
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }
}

pub struct MockConnector(Script);

impl Connector for MockConnector {
    type Link = MockLink;

    fn connect(&mut self, path: &Path, _config: &SerialConfig) -> ttylink::Result<MockLink> {
        let mut state = self.0.state();
        state.connects += 1;
        let ok = state.connect_results.pop_front().unwrap_or(true);
        state.events.push(format!("connect {} {}", path.display(), if ok { "ok" } else { "fail" }));
        if !ok {
            return Err(Error::Open {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        state.open_links += 1;
        Ok(MockLink(self.0.clone()))
    }
}

pub struct MockLink(Script);

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.state();
        match state.reads.pop_front() {
            Some(Step::Data(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                state.events.push(format!("read {n}"));
                Ok(n)
            }
            Some(Step::Eof) => {
                state.events.push("read 0".to_string());
                Ok(0)
            }
            Some(Step::Fail(kind)) => {
                state.events.push("read error".to_string());
                Err(io::Error::from(kind))
            }
            None => Err(io::Error::from(io::ErrorKind::WouldBlock)),
        }
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.state();
        let n = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Link for MockLink {
    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<Option<usize>> {
        let state = self.0.state();
        match state.reads.front() {
            Some(Step::Data(bytes)) => Ok(Some(bytes.len())),
            Some(_) => Ok(Some(0)),
            None => {
                if let Some(token) = &state.cancel_when_drained {
                    token.cancel();
                }
                Ok(None)
            }
        }
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        let mut state = self.0.state();
        state.open_links -= 1;
        state.events.push("release".to_string());
    }
}

pub struct RecordingSleeper(Script);

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        let mut state = self.0.state();
        state.sleeps.push(duration);
        state.events.push(format!("sleep {}ms", duration.as_millis()));
    }
}
