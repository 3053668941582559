use std::ops::{Add, AddAssign, Mul};

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    /// True when either channel's magnitude is strictly above `threshold`.
    #[inline]
    pub fn exceeds(self, threshold: f32) -> bool {
        self.left.abs() > threshold || self.right.abs() > threshold
    }
}

/// One block of planar stereo audio as the host hands it over.
///
/// The engine processes `len()` frames, the shortest of the four slices.
pub struct AudioBlock<'a> {
    pub input_left: &'a [f32],
    pub input_right: &'a [f32],
    pub output_left: &'a mut [f32],
    pub output_right: &'a mut [f32],
}

impl AudioBlock<'_> {
    pub fn len(&self) -> usize {
        self.input_left
            .len()
            .min(self.input_right.len())
            .min(self.output_left.len())
            .min(self.output_right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Add for StereoFrame {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.left + rhs.left, self.right + rhs.right)
    }
}

impl AddAssign for StereoFrame {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.left += rhs.left;
        self.right += rhs.right;
    }
}

impl Mul<f32> for StereoFrame {
    type Output = Self;

    #[inline]
    fn mul(self, gain: f32) -> Self {
        Self::new(self.left * gain, self.right * gain)
    }
}
