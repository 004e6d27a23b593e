use std::f32::consts::FRAC_PI_2;

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn scaled(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    /// Equal-power stereo panning; pan in [-1, 1]. At the extremes the
    /// opposite channel is folded into the surviving one, at 0 the frame
    /// passes through unchanged.
    pub fn panned(self, pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        if pan <= 0.0 {
            let x = (pan + 1.0) * FRAC_PI_2;
            Self {
                left: self.left + self.right * x.cos(),
                right: self.right * x.sin(),
            }
        } else {
            let x = pan * FRAC_PI_2;
            Self {
                left: self.left * x.cos(),
                right: self.right + self.left * x.sin(),
            }
        }
    }

    pub fn add(&mut self, other: StereoFrame) {
        self.left += other.left;
        self.right += other.right;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_pan_is_identity() {
        let f = StereoFrame { left: 0.5, right: -0.25 }.panned(0.0);
        assert!((f.left - 0.5).abs() < 1e-6);
        assert!((f.right + 0.25).abs() < 1e-6);
    }

    #[test]
    fn hard_left_folds_right_channel() {
        let f = StereoFrame { left: 0.5, right: 0.5 }.panned(-1.0);
        assert!((f.left - 1.0).abs() < 1e-6);
        assert!(f.right.abs() < 1e-6);
    }
}
