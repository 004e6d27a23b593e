use std::path::Path;

use anyhow::Context;

use super::frame::StereoFrame;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the decoded audio, already at the output rate
}

impl SampleBuffer {
    // Load a WAV file from disk into the sample buffer, converted to stereo
    // at `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        // mono is duplicated, anything wider keeps its first two channels
        let frames: Vec<StereoFrame> = samples
            .chunks_exact(channels)
            .map(|c| StereoFrame {
                left: c[0],
                right: if channels > 1 { c[1] } else { c[0] },
            })
            .collect();

        Ok(Self { data: resample_linear(&frames, spec.sample_rate, target_rate) })
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        self.data.len() as f64 / sample_rate as f64
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate || frames.is_empty() {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;

    (0..out_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let idx = src_pos.floor() as usize;
            let frac = (src_pos - idx as f64) as f32;
            match (frames.get(idx), frames.get(idx + 1)) {
                (Some(a), Some(b)) => StereoFrame {
                    left: a.left * (1.0 - frac) + b.left * frac,
                    right: a.right * (1.0 - frac) + b.right * frac,
                },
                _ => frames[frames.len() - 1],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_doubles_length() {
        let frames = vec![
            StereoFrame { left: 0.0, right: 0.0 },
            StereoFrame { left: 1.0, right: 1.0 },
        ];
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 4);
        assert!((out[1].left - 0.5).abs() < 1e-6);
        assert_eq!(out[3], frames[1]);
    }

    #[test]
    fn loads_mono_int_wav_as_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("click.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0i16, i16::MAX / 2, 0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let buf = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buf.data.len(), 3);
        assert!((buf.data[1].left - 0.5).abs() < 1e-3);
        assert_eq!(buf.data[1].left, buf.data[1].right);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SampleBuffer::load_wav(Path::new("/nonexistent/x.wav"), 44100).is_err());
    }
}
