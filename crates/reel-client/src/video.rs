//! Video element abstraction.
//!
//! The video's reported position is the playback ground truth; the
//! controller only follows it.

use tokio::time::Instant;

use crate::error::Result;

/// The media element paired with the editor during playback.
pub trait VideoElement {
    /// Current playback position in milliseconds.
    fn current_time(&self) -> u64;

    /// # Errors
    ///
    /// Returns an error if the element refuses to play.
    fn play(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the element refuses to pause.
    fn pause(&mut self) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the element cannot seek to `position`.
    fn seek(&mut self, position: u64) -> Result<()>;
}

/// Clock-driven stand-in for a real video element.
///
/// Advances with the tokio clock while playing, so paused-time tests are
/// deterministic.
#[derive(Debug, Clone)]
pub struct SimulatedVideo {
    position: u64,
    playing_since: Option<Instant>,
    duration: u64,
}

impl SimulatedVideo {
    pub const fn new(duration: u64) -> Self {
        Self {
            position: 0,
            playing_since: None,
            duration,
        }
    }

    pub const fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }
}

impl VideoElement for SimulatedVideo {
    fn current_time(&self) -> u64 {
        let elapsed = self.playing_since.map_or(0, |since| {
            u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
        });
        self.position.saturating_add(elapsed).min(self.duration)
    }

    fn play(&mut self) -> Result<()> {
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.position = self.current_time();
        self.playing_since = None;
        Ok(())
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        self.position = position.min(self.duration);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }
}
