use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent, MouseEvent};

use crate::loader::TraceIndex;
use crate::trace::TraceSession;

/// Unified application event.
///
/// Results from background campaigns carry the generation they were started
/// under; the event loop drops any whose generation is no longer current.
#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Tick,
    IndexReady {
        generation: u64,
        index: TraceIndex,
    },
    TraceReady {
        generation: u64,
        session: Box<TraceSession>,
    },
    LoadFailed {
        generation: u64,
        message: String,
    },
}

/// Spawn a thread that polls crossterm input events and sends them to the channel.
pub fn spawn_key_reader(tx: mpsc::Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        if event::poll(Duration::from_millis(50)).unwrap_or(false) {
            let sent = match event::read() {
                Ok(Event::Key(key)) => tx.send(AppEvent::Key(key)),
                Ok(Event::Mouse(mouse)) => tx.send(AppEvent::Mouse(mouse)),
                _ => Ok(()),
            };
            if sent.is_err() {
                break;
            }
        }
    });
}

/// Spawn a tick timer that sends Tick events at the given interval.
pub fn spawn_tick_timer(tx: mpsc::Sender<AppEvent>, interval: Duration) {
    std::thread::spawn(move || loop {
        std::thread::sleep(interval);
        if tx.send(AppEvent::Tick).is_err() {
            break;
        }
    });
}
