use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::AudioCommand;

mod backend;
mod engine;
mod frame;
mod ids;
mod offline;
pub mod routing;
mod sample_buffer;
mod voice;

pub use backend::{AudioBackend, NodeKind, Sink};
pub use engine::Engine;
pub use frame::StereoFrame;
pub use offline::{OfflineBackend, ScheduledPlayback};
pub use ids::{next_node_handle, next_sample_id, next_voice_id, NodeHandle, SampleId, VoiceId};
pub use sample_buffer::SampleBuffer;

/// Control-side end of the audio engine. Commands travel to the audio
/// thread over a bounded channel; the clock comes back as a frame counter.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

// how long a cancel may wait for the callback to make room in a full queue
const CANCEL_WAIT: Duration = Duration::from_millis(50);

// Queues `cmd` for the audio thread without blocking, or waiting at most
// `wait` for room. False when the command was dropped.
fn deliver(tx: &Sender<AudioCommand>, cmd: AudioCommand, wait: Option<Duration>) -> bool {
    match wait {
        None => tx.try_send(cmd).is_ok(),
        Some(wait) => tx.send_timeout(cmd, wait).is_ok(),
    }
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if !deliver(&self.tx, cmd, None) {
            log::warn!(target: "audio", "engine queue full or closed, dropped a command");
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn register_sample(&self, id: SampleId, buffer: SampleBuffer) {
        self.send(AudioCommand::RegisterSample { id, buffer });
    }
}

pub fn seconds_to_frame(at: f64, sample_rate: u32) -> u64 {
    (at.max(0.0) * sample_rate as f64).round() as u64
}

impl AudioBackend for AudioHandle {
    fn current_time(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn create_node(&mut self, kind: NodeKind) -> NodeHandle {
        let node = next_node_handle();
        self.send(AudioCommand::CreateNode { node, kind });
        node
    }

    fn set_node(&mut self, node: NodeHandle, kind: NodeKind) {
        self.send(AudioCommand::SetNode { node, kind });
    }

    fn connect(&mut self, from: NodeHandle, to: Sink) {
        self.send(AudioCommand::Connect { from, to });
    }

    fn disconnect(&mut self, node: NodeHandle) {
        self.send(AudioCommand::Disconnect { node });
    }

    fn release_node(&mut self, node: NodeHandle) {
        self.send(AudioCommand::ReleaseNode { node });
    }

    fn schedule_playback(&mut self, sample: SampleId, at: f64, dest: NodeHandle) -> VoiceId {
        let voice = next_voice_id();
        let start_frame = seconds_to_frame(at, self.sample_rate);
        self.send(AudioCommand::Schedule { voice, sample, dest, start_frame });
        voice
    }

    // a dropped cancel would let a stopped hit sound, so this one may block briefly
    fn cancel_playback(&mut self, voice: VoiceId) {
        if !deliver(&self.tx, AudioCommand::Cancel { voice }, Some(CANCEL_WAIT)) {
            log::warn!(target: "audio", "engine queue stayed full, {:?} may still sound", voice);
        }
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    let clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, clock.clone(), channels)?;
            output_stream.play().context("failed to play output stream")?;
            log::info!(target: "audio", "output running at {} Hz, {} channels", sample_rate, channels);

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {:?} (only f32 supported for now)", other),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    clock: Arc<AtomicU64>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(clock);
    let mut frames: Vec<StereoFrame> = vec![StereoFrame::zero(); 4096];

    let err_fn = |err| log::error!(target: "audio", "output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            if frames.len() < n_frames {
                frames.resize(n_frames, StereoFrame::zero());
            }
            let block = &mut frames[..n_frames];
            engine.render_block(block);

            // interleave; mono devices get the average, extra channels stay silent
            for (out, f) in data.chunks_exact_mut(channels).zip(block.iter()) {
                match out {
                    [mono] => *mono = (f.left + f.right) * 0.5,
                    [l, r, rest @ ..] => {
                        *l = f.left;
                        *r = f.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn cancel_waits_for_room_in_a_full_queue() {
        let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1);
        assert!(deliver(&tx, AudioCommand::Disconnect { node: NodeHandle(1) }, None));
        assert!(!deliver(&tx, AudioCommand::Cancel { voice: VoiceId(7) }, None));

        let drain = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            let first = rx.recv().unwrap();
            let second = rx.recv().unwrap();
            (first, second)
        });
        assert!(deliver(&tx, AudioCommand::Cancel { voice: VoiceId(7) }, Some(Duration::from_secs(2))));
        let (_, second) = drain.join().unwrap();
        assert!(matches!(second, AudioCommand::Cancel { voice: VoiceId(7) }));
    }

    #[test]
    fn closed_queue_drops_without_waiting() {
        let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1);
        drop(rx);
        assert!(!deliver(&tx, AudioCommand::Cancel { voice: VoiceId(1) }, Some(Duration::from_secs(2))));
    }
}
