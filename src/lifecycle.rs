//! Lifecycle commands read from the terminal, standing in for the host
//! environment's foreground/background notifications.

use crate::scheduler::Lifecycle;
use anyhow::{bail, Context};
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

/// Command typed by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Simulates the application going to the background.
    Background,
    /// Simulates the application coming back to the foreground.
    Foreground,
    /// Exits the application.
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "background" | "bg" => Command::Background,
            "foreground" | "fg" => Command::Foreground,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("Unknown command `{other}`, expected background, foreground or quit"),
        })
    }
}

/// Why the command loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The user asked to quit.
    Quit,
    /// No more input.
    EndOfInput,
}

/// Reads lines on a dedicated thread and forwards them over a channel.
///
/// The thread is detached: a read pending on it never holds back the shutdown
/// of the runtime or of the process.
pub fn read_lines<R>(reader: R) -> UnboundedReceiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in reader.lines() {
            if tx.unbounded_send(line).is_err() {
                return;
            }
        }
        debug!("End of command input");
    });
    rx
}

/// Loop that reads commands line by line, and forwards them to the given
/// [`Lifecycle`].
pub async fn command_loop<S, L>(mut lines: S, lifecycle: &mut L) -> anyhow::Result<Exit>
where
    S: Stream<Item = io::Result<String>> + Unpin,
    L: Lifecycle,
{
    while let Some(line) = lines.next().await {
        let line = line.context("Failed to read lifecycle command")?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Background) => {
                info!("Entering background");
                lifecycle.on_background();
            }
            Ok(Command::Foreground) => {
                info!("Entering foreground");
                lifecycle.on_foreground();
            }
            Ok(Command::Quit) => return Ok(Exit::Quit),
            Err(e) => warn!("{e}"),
        }
    }
    Ok(Exit::EndOfInput)
}
