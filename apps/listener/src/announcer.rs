//! Spoken cues. The engine only produces text; a worker thread owns the speech
//! backend so a slow voice never holds up tick processing.

use std::{
    io,
    process::Command,
    thread::{self, JoinHandle},
};

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, warn};

/// Cues waiting beyond this are dropped.
pub const QUEUE_DEPTH: usize = 16;

pub trait Speaker: Send + 'static {
    fn say(&mut self, text: &str) -> Result<()>;
}

/// Runs an external program once per cue, text as the last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// Split a command line on whitespace. `None` when it is blank.
    ///
    /// No shell is involved: quotes and escapes are passed through as literal
    /// characters, so an argument can never contain a space. Wrap anything
    /// fancier in a script and point the command at that.
    pub fn parse(cmd: &str) -> Option<Self> {
        let mut parts = cmd.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self { program, args: parts.collect() })
    }
}

impl Speaker for CommandSpeaker {
    fn say(&mut self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .status()
            .with_context(|| format!("running {}", self.program))?;
        if !status.success() {
            bail!("{} exited with {status}", self.program);
        }
        Ok(())
    }
}

/// Fallback when no speech program is configured.
#[derive(Debug, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
    fn say(&mut self, text: &str) -> Result<()> {
        info!(cue = text, "announce");
        Ok(())
    }
}

/// Handle to the announcer worker. Dropping it stops the worker once the
/// queue is drained.
pub struct Announcer {
    tx: Sender<String>,
}

impl Announcer {
    pub fn spawn<S: Speaker>(speaker: S) -> io::Result<(Self, JoinHandle<()>)> {
        let (tx, rx) = bounded(QUEUE_DEPTH);
        let handle = thread::Builder::new()
            .name("announcer".into())
            .spawn(move || worker(rx, speaker))?;
        Ok((Self { tx }, handle))
    }

    /// Queue a cue without blocking. Returns false if it was dropped.
    pub fn announce(&self, text: String) -> bool {
        match self.tx.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(text)) => {
                debug!(cue = %text, "announcer busy, cue dropped");
                false
            }
            Err(TrySendError::Disconnected(text)) => {
                warn!(cue = %text, "announcer gone, cue dropped");
                false
            }
        }
    }
}

fn worker<S: Speaker>(rx: Receiver<String>, mut speaker: S) {
    for text in rx.iter() {
        if let Err(e) = speaker.say(&text) {
            warn!(error = %e, cue = %text, "announcer failed");
        }
    }
    debug!("announcer stopped");
}
