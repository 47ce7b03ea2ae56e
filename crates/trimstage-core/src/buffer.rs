//! In-place audio buffer handed to the signal path.
//!
//! The host delivers one mutable slice per channel. The first
//! `num_input_channels` slices arrive holding input audio and are overwritten
//! with the processed result; any further channels are output-only and get
//! silenced, which covers hosts that open more outputs than inputs.
//!
//! # Real-Time Safety
//!
//! Channel slices live in a fixed-size array on the stack. Constructing and
//! using a `Buffer` never allocates.
//!
//! ```ignore
//! let mut left = [0.0f32; 512];
//! let mut right = [0.0f32; 512];
//! let mut buffer = Buffer::new([&mut left[..], &mut right[..]], 2, 512);
//! processor.process(&mut buffer, &midi);
//! ```

use crate::sample::Sample;
use crate::types::MAX_CHANNELS;

/// Main audio buffer for in-place processing.
///
/// `S` is the sample type, defaulting to `f32`. Use `Buffer<f64>` for
/// double-precision hosts.
pub struct Buffer<'a, S: Sample = f32> {
    channels: [Option<&'a mut [S]>; MAX_CHANNELS],
    num_channels: usize,
    num_input_channels: usize,
    num_samples: usize,
}

impl<'a, S: Sample> Buffer<'a, S> {
    /// Create a buffer from channel slices.
    ///
    /// Channels beyond [`MAX_CHANNELS`] are ignored. `num_samples` is
    /// limited to the shortest channel, and `num_input_channels` to the
    /// channel count.
    #[inline]
    pub fn new(
        channels: impl IntoIterator<Item = &'a mut [S]>,
        num_input_channels: usize,
        num_samples: usize,
    ) -> Self {
        // Can't use [None; N] for &mut because it's not Copy
        let mut slots: [Option<&'a mut [S]>; MAX_CHANNELS] = std::array::from_fn(|_| None);
        let mut num_channels = 0;
        let mut num_samples = num_samples;
        for (i, slice) in channels.into_iter().take(MAX_CHANNELS).enumerate() {
            num_samples = num_samples.min(slice.len());
            slots[i] = Some(slice);
            num_channels = i + 1;
        }
        if num_channels == 0 {
            num_samples = 0;
        }

        Self {
            channels: slots,
            num_channels,
            num_input_channels: num_input_channels.min(num_channels),
            num_samples,
        }
    }

    /// Number of samples in this block.
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Number of channels (input-carrying and output-only).
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Number of channels that arrived holding input audio.
    #[inline]
    pub fn num_input_channels(&self) -> usize {
        self.num_input_channels
    }

    /// Get a channel by index. Empty if the channel doesn't exist.
    #[inline]
    pub fn channel(&self, channel: usize) -> &[S] {
        let n = self.num_samples;
        self.channels
            .get(channel)
            .and_then(|slot| slot.as_deref())
            .map(|ch| &ch[..n])
            .unwrap_or(&[])
    }

    /// Get a mutable channel by index. Empty if the channel doesn't exist.
    #[inline]
    pub fn channel_mut(&mut self, channel: usize) -> &mut [S] {
        let n = self.num_samples;
        match self.channels.get_mut(channel).and_then(|slot| slot.as_deref_mut()) {
            Some(ch) => &mut ch[..n],
            None => &mut [],
        }
    }

    /// Iterate over the input-carrying channels.
    #[inline]
    pub fn inputs(&self) -> impl Iterator<Item = &[S]> {
        (0..self.num_input_channels).map(move |ch| self.channel(ch))
    }

    /// Silence the output-only channels.
    pub fn clear_extra_outputs(&mut self) {
        for ch in self.num_input_channels..self.num_channels {
            self.channel_mut(ch).fill(S::ZERO);
        }
    }
}
