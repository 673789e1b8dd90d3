// SPDX-License-Identifier: MPL-2.0

//! Lock-free per-package progress channel: one atomic phase cell per
//! package index, written by that package's worker thread and polled by
//! a single renderer. No locks: relaxed-to-release stores, acquire loads.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Waiting = 0,
    Downloading = 1,
    Extracting = 2,
    Installing = 3,
    Relocating = 4,
    Linking = 5,
    Done = 6,
    Failed = 7,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Downloading,
            2 => Phase::Extracting,
            3 => Phase::Installing,
            4 => Phase::Relocating,
            5 => Phase::Linking,
            6 => Phase::Done,
            7 => Phase::Failed,
            _ => Phase::Waiting,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }

    fn label(self) -> &'static str {
        match self {
            Phase::Waiting => "waiting",
            Phase::Downloading => "downloading",
            Phase::Extracting => "extracting",
            Phase::Installing => "installing",
            Phase::Relocating => "relocating",
            Phase::Linking => "linking",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }
}

struct PhaseCell(AtomicU8);

impl PhaseCell {
    fn new() -> Self {
        Self(AtomicU8::new(Phase::Waiting as u8))
    }

    fn store(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    fn load(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Owned by the orchestrator; one handle per package index is cloned
/// out to that package's worker via [`Channel::handle`].
pub struct Channel {
    names: Vec<String>,
    cells: Vec<PhaseCell>,
}

impl Channel {
    pub fn new(names: Vec<String>) -> Self {
        let cells = names.iter().map(|_| PhaseCell::new()).collect();
        Self { names, cells }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// A worker-side write handle for package `index`.
    pub fn handle(&self, index: usize) -> Handle<'_> {
        Handle { cell: &self.cells[index] }
    }

    fn phase_at(&self, index: usize) -> Phase {
        self.cells[index].load()
    }

    fn all_terminal(&self) -> bool {
        self.cells.iter().all(|c| c.load().is_terminal())
    }
}

/// Cheap `Copy`-free handle passed into one worker closure.
pub struct Handle<'a> {
    cell: &'a PhaseCell,
}

impl Handle<'_> {
    pub fn set(&self, phase: Phase) {
        self.cell.store(phase);
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(80);

/// Render `channel`'s progress to the terminal. On a TTY this paints a
/// live one-row-per-package table via `indicatif`; on non-TTY it is
/// silent until every package reaches a terminal phase, then prints one
/// final line per package. Blocks until all packages finish.
pub fn render(channel: &Channel) {
    if std::io::stderr().is_terminal() {
        render_tty(channel);
    } else {
        render_plain(channel);
    }
}

fn render_tty(channel: &Channel) {
    let multi = MultiProgress::new();
    let style = ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ");

    let bars: Vec<ProgressBar> = channel
        .names
        .iter()
        .map(|name| {
            let bar = multi.add(ProgressBar::new_spinner());
            bar.set_style(style.clone());
            bar.set_prefix(name.clone());
            bar.enable_steady_tick(POLL_INTERVAL);
            bar
        })
        .collect();

    loop {
        let mut done = true;
        for (i, bar) in bars.iter().enumerate() {
            let phase = channel.phase_at(i);
            bar.set_message(phase.label());
            if phase.is_terminal() {
                bar.finish_with_message(phase.label());
            } else {
                done = false;
            }
        }
        if done {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn render_plain(channel: &Channel) {
    while !channel.all_terminal() {
        std::thread::sleep(POLL_INTERVAL);
    }
    for (i, name) in channel.names.iter().enumerate() {
        println!("{name}: {}", channel.phase_at(i).label());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn phase_round_trips_through_u8() {
        for phase in [
            Phase::Waiting,
            Phase::Downloading,
            Phase::Extracting,
            Phase::Installing,
            Phase::Relocating,
            Phase::Linking,
            Phase::Done,
            Phase::Failed,
        ] {
            assert_eq!(Phase::from_u8(phase as u8), phase);
        }
    }

    #[test]
    fn handle_writes_are_visible_through_channel() {
        let channel = Channel::new(vec!["tree".into(), "jq".into()]);
        channel.handle(0).set(Phase::Downloading);
        channel.handle(1).set(Phase::Done);

        assert_eq!(channel.phase_at(0), Phase::Downloading);
        assert_eq!(channel.phase_at(1), Phase::Done);
        assert!(!channel.all_terminal());

        channel.handle(0).set(Phase::Done);
        assert!(channel.all_terminal());
    }
}
