// The coarse timing source. Runs on its own thread so a slow frame on the
// UI side can't delay or merge ticks, and talks to the scheduler only through
// one-way messages. Ticks carry no timestamp: the receiver reads the audio
// clock when it handles one.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, never, select, tick, unbounded};

#[derive(Clone, Debug, PartialEq)]
pub enum TimerCommand {
    IntervalStart { interval: f64 }, // seconds
    IntervalClear,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TimerEvent {
    IntervalElapsed,
    Debug { log: String },
}

pub struct Ticker {
    tx: Sender<TimerCommand>,
    rx: Receiver<TimerEvent>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = unbounded::<TimerCommand>();
        let (event_tx, event_rx) = unbounded::<TimerEvent>();
        let worker = thread::Builder::new()
            .name("loopbox-ticker".into())
            .spawn(move || run(cmd_rx, event_tx))
            .ok();
        if worker.is_none() {
            log::error!(target: "ticker", "could not spawn timer thread, transport will not advance");
        }
        Self { tx: cmd_tx, rx: event_rx, worker }
    }

    pub fn events(&self) -> &Receiver<TimerEvent> {
        &self.rx
    }

    /// Everything the worker has sent so far, oldest first.
    pub fn drain(&self) -> Vec<TimerEvent> {
        self.rx.try_iter().collect()
    }
}

/// Arms and disarms a periodic tick. The scheduler only needs this much of
/// the timing source.
pub trait TickControl {
    /// Starts ticking every `interval` seconds, replacing any running interval.
    fn start(&self, interval: f64);

    /// Idempotent.
    fn stop(&self);
}

impl TickControl for Ticker {
    fn start(&self, interval: f64) {
        let _ = self.tx.send(TimerCommand::IntervalStart { interval });
    }

    fn stop(&self) {
        let _ = self.tx.send(TimerCommand::IntervalClear);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        // swapping in a dead sender disconnects the worker's command channel
        let (dead, _) = unbounded();
        drop(std::mem::replace(&mut self.tx, dead));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

enum Wake {
    Command(TimerCommand),
    Tick,
}

fn run(commands: Receiver<TimerCommand>, events: Sender<TimerEvent>) {
    let mut ticks: Receiver<Instant> = never();
    loop {
        let wake = select! {
            recv(commands) -> msg => match msg {
                Ok(cmd) => Wake::Command(cmd),
                Err(_) => return, // owner dropped
            },
            recv(ticks) -> _ => Wake::Tick,
        };
        let sent = match wake {
            Wake::Tick => events.send(TimerEvent::IntervalElapsed),
            Wake::Command(TimerCommand::IntervalStart { interval }) => {
                let period = Duration::from_secs_f64(interval.max(0.001));
                ticks = tick(period);
                events.send(TimerEvent::Debug { log: format!("interval {:?}", period) })
            }
            Wake::Command(TimerCommand::IntervalClear) => {
                ticks = never();
                events.send(TimerEvent::Debug { log: "cleared".into() })
            }
        };
        if sent.is_err() {
            return;
        }
    }
}
