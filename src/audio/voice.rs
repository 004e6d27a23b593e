use super::frame::StereoFrame;
use super::ids::{NodeHandle, SampleId, VoiceId};
use super::sample_buffer::SampleBuffer;

/// One scheduled one-shot playback of a sample, waiting for or past its
/// start frame.
#[derive(Clone, Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub sample: SampleId,
    pub dest: NodeHandle,
    pub start_frame: u64,
    pos: usize,
    pub active: bool,
}

impl Voice {
    pub fn new(id: VoiceId, sample: SampleId, dest: NodeHandle, start_frame: u64) -> Self {
        Self {
            id,
            sample,
            dest,
            start_frame,
            pos: 0,
            active: true,
        }
    }

    pub fn has_started(&self, frame: u64) -> bool {
        frame >= self.start_frame
    }

    /// Writes this voice's contribution for the block starting at
    /// `block_start` into `out` (overwriting it). Returns the range of `out`
    /// that was written, or None if the voice is silent for this block.
    pub fn render_into(
        &mut self,
        buffer: &SampleBuffer,
        block_start: u64,
        out: &mut [StereoFrame],
    ) -> Option<std::ops::Range<usize>> {
        if !self.active {
            return None;
        }
        let block_end = block_start + out.len() as u64;
        if self.start_frame >= block_end {
            return None; // not yet
        }
        // sample-accurate start inside the block
        let offset = self.start_frame.saturating_sub(block_start) as usize;
        let remaining = buffer.data.len().saturating_sub(self.pos);
        let n = remaining.min(out.len() - offset);
        if n == 0 {
            self.active = false;
            return None;
        }
        out[offset..offset + n].copy_from_slice(&buffer.data[self.pos..self.pos + n]);
        self.pos += n;
        if self.pos >= buffer.data.len() {
            self.active = false;
        }
        Some(offset..offset + n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> SampleBuffer {
        SampleBuffer {
            data: (0..len)
                .map(|i| StereoFrame { left: i as f32, right: i as f32 })
                .collect(),
        }
    }

    #[test]
    fn starts_mid_block() {
        let buf = ramp(8);
        let mut v = Voice::new(VoiceId(0), SampleId(0), NodeHandle(0), 100);
        let mut out = vec![StereoFrame::zero(); 4];
        assert_eq!(v.render_into(&buf, 96, &mut out), None);
        let mut out = vec![StereoFrame::zero(); 4];
        let range = v.render_into(&buf, 98, &mut out).unwrap();
        assert_eq!(range, 2..4);
        assert_eq!(out[2].left, 0.0);
        assert_eq!(out[3].left, 1.0);
    }

    #[test]
    fn finishes_at_end_of_buffer() {
        let buf = ramp(3);
        let mut v = Voice::new(VoiceId(0), SampleId(0), NodeHandle(0), 0);
        let mut out = vec![StereoFrame::zero(); 8];
        assert_eq!(v.render_into(&buf, 0, &mut out), Some(0..3));
        assert!(!v.active);
    }
}
