//! Camera frame differencing for "cosmic ray" strikes.
//!
//! A strike is modelled as pixels that brighten sharply from one frame to
//! the next. The thresholds are narrative, not physical.

use crate::sensor::types::VideoFrame;

/// Hits found when comparing a frame to its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHits {
    pub hits: u32,
    /// Hits across every comparison this scan, including this one
    pub cumulative: u64,
}

/// Keeps the previous frame's brightness map and counts hits.
#[derive(Debug, Clone)]
pub struct FrameDiffer {
    brightness_delta: u8,
    previous: Option<(u32, u32, Vec<u8>)>,
    cumulative: u64,
}

impl FrameDiffer {
    pub fn new(brightness_delta: u8) -> Self {
        Self {
            brightness_delta,
            previous: None,
            cumulative: 0,
        }
    }

    /// Compare `frame` with the previous one and remember it.
    ///
    /// The first frame, or a frame whose dimensions changed, has nothing to
    /// compare against and yields `None`.
    pub fn compare(&mut self, frame: &VideoFrame) -> Option<FrameHits> {
        let current: Vec<u8> = frame.brightness().collect();

        let hits = match &self.previous {
            Some((w, h, prev)) if *w == frame.width && *h == frame.height => Some(
                current
                    .iter()
                    .zip(prev)
                    .filter(|&(&now, &before)| {
                        now as i16 - before as i16 > self.brightness_delta as i16
                    })
                    .count() as u32,
            ),
            _ => None,
        };

        self.previous = Some((frame.width, frame.height, current));

        hits.map(|hits| {
            self.cumulative += hits as u64;
            FrameHits {
                hits,
                cumulative: self.cumulative,
            }
        })
    }

    pub fn cumulative(&self) -> u64 {
        self.cumulative
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.cumulative = 0;
    }
}
