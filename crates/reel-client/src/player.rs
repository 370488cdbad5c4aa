//! Time-travel playback.
//!
//! The controller owns the time cursor. Moving it forward applies the
//! recorded `changes` in ascending order; moving it backward applies the
//! `invertedChanges` in descending order. Every edit reaches the editor via
//! [`EditorView::apply_programmatic`].
//!
//! The applied cursor is half-open: a record is applied iff its timestamp is
//! below the cursor. At the end of the timeline the cursor moves past every
//! record, so records stamped exactly at the duration are included.

use std::collections::VecDeque;
use std::time::Duration;

use reel_core::{ChangeIndex, EditOperation, Session, SessionId};
use serde::Serialize;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::editor::EditorView;
use crate::error::{ClientError, Result};
use crate::source::SessionSource;
use crate::video::VideoElement;

/// Playback settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Period of the playback and stepwise-scrub tick.
    pub tick_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(20),
        }
    }
}

/// State exposed to the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub video_duration: u64,
    pub video_position: u64,
    pub playing: bool,
    pub errors: Vec<String>,
}

/// Drives an editor and a video element along a recorded session.
pub struct PlaybackController<E: EditorView, V: VideoElement> {
    editor: E,
    video: V,
    config: PlaybackConfig,
    state: PlaybackState,
    session_id: Option<SessionId>,
    index: ChangeIndex,
    cursor: u64,
    ticker: Option<Interval>,
    steps: VecDeque<EditOperation>,
}

impl<E: EditorView, V: VideoElement> PlaybackController<E, V> {
    pub fn new(editor: E, video: V, config: PlaybackConfig) -> Self {
        Self {
            editor,
            video,
            config,
            state: PlaybackState::default(),
            session_id: None,
            index: ChangeIndex::default(),
            cursor: 0,
            ticker: None,
            steps: VecDeque::new(),
        }
    }

    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub const fn editor(&self) -> &E {
        &self.editor
    }

    pub const fn video(&self) -> &V {
        &self.video
    }

    pub const fn index(&self) -> &ChangeIndex {
        &self.index
    }

    pub const fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    /// Edits still waiting in the stepwise-scrub queue.
    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }

    /// Fetch a session and prepare it for playback.
    ///
    /// # Errors
    ///
    /// Returns the fetch or indexing failure, which is also recorded in
    /// [`PlaybackState::errors`].
    pub async fn load(&mut self, source: &dyn SessionSource, session_id: SessionId) -> Result<()> {
        let session = match source.fetch_session(session_id).await {
            Ok(session) => session,
            Err(e) => return Err(self.record_error(e)),
        };
        self.load_session(&session)
    }

    /// Prepare an already fetched session for playback.
    ///
    /// A previously loaded session is rewound to its start first, so the
    /// editor holds only the new session's edits.
    ///
    /// # Errors
    ///
    /// Returns [`reel_core::Error::UnsortedLog`] if the change log is out of
    /// order and [`reel_core::Error::TimelineTooLong`] if a record lies past
    /// the supported timeline; the current session stays loaded.
    pub fn load_session(&mut self, session: &Session) -> Result<()> {
        let index = match ChangeIndex::build(session.changes.iter().cloned()) {
            Ok(index) => index,
            Err(e) => return Err(self.record_error(e.into())),
        };

        self.halt();
        self.move_cursor(0);

        self.index = index;
        self.session_id = Some(session.id);
        self.cursor = 0;
        self.state.video_duration = session.timeline_duration();
        self.state.video_position = 0;
        if let Err(e) = self.video.seek(0) {
            self.record_error(e);
        }
        info!(
            session_id = %session.id,
            records = self.index.record_count(),
            buckets = self.index.len(),
            duration = self.state.video_duration,
            "Session loaded"
        );
        Ok(())
    }

    /// Play when paused, pause when playing.
    ///
    /// Playing from the end of the timeline restarts from the beginning.
    pub fn toggle_play(&mut self) {
        self.flush_steps();
        if self.state.playing {
            self.pause();
            return;
        }

        if self.state.video_position >= self.state.video_duration {
            debug!("Restarting playback from the beginning");
            self.move_cursor(0);
            self.seek_video(0);
        }
        self.resume();
    }

    /// Wait for the next tick and process it.
    ///
    /// Returns `false` when nothing is scheduled: playback is paused and no
    /// stepwise scrub is pending.
    pub async fn next_tick(&mut self) -> bool {
        let Some(ticker) = self.ticker.as_mut() else {
            return false;
        };
        ticker.tick().await;

        if let Some(op) = self.steps.pop_front() {
            self.apply(&op);
            if self.steps.is_empty() && !self.state.playing {
                self.ticker = None;
            }
        } else {
            self.tick();
        }
        true
    }

    /// Follow the video to its current position, applying the edits in between.
    pub fn tick(&mut self) {
        if !self.state.playing {
            return;
        }
        let position = self.video.current_time().min(self.state.video_duration);
        self.move_cursor(self.cursor_for(position));
        self.state.video_position = position;

        if position >= self.state.video_duration {
            debug!("Reached the end of the session");
            self.pause();
        }
    }

    /// Seek to `target` milliseconds, clamped to the timeline.
    ///
    /// Playback pauses for the seek and picks up again from the new position
    /// if it was running, unless the seek landed on the end.
    pub fn set_time(&mut self, target: u64) {
        self.flush_steps();
        let was_playing = self.state.playing;
        self.halt();

        let position = target.min(self.state.video_duration);
        self.move_cursor(self.cursor_for(position));
        self.seek_video(position);

        if was_playing && position < self.state.video_duration {
            self.resume();
        }
    }

    /// Seek to `target` but replay the edits one per tick.
    ///
    /// The cursor and video jump immediately; [`next_tick`](Self::next_tick)
    /// then drains the queued edits. Any later seek or play first applies
    /// whatever is still queued.
    pub fn scrub_stepwise(&mut self, target: u64) {
        self.flush_steps();
        self.halt();

        let position = target.min(self.state.video_duration);
        let to = self.cursor_for(position);
        let steps = self.deltas(self.cursor, to);
        self.steps.extend(steps);
        self.cursor = to;
        self.seek_video(position);

        if !self.steps.is_empty() {
            debug!(steps = self.steps.len(), "Stepwise scrub queued");
            self.ticker = Some(self.new_ticker());
        }
    }

    /// Cursor position for a timeline position.
    fn cursor_for(&self, position: u64) -> u64 {
        if position >= self.state.video_duration {
            u64::MAX
        } else {
            position
        }
    }

    /// The edits that take the editor from cursor `from` to cursor `to`.
    fn deltas(&self, from: u64, to: u64) -> Vec<EditOperation> {
        if to > from {
            self.index
                .query_range(from, to)
                .into_iter()
                .flat_map(|record| record.changes.iter().cloned())
                .collect()
        } else {
            self.index
                .query_range(to, from)
                .into_iter()
                .rev()
                .flat_map(|record| record.inverted_changes.iter().cloned())
                .collect()
        }
    }

    fn move_cursor(&mut self, to: u64) {
        if to == self.cursor {
            return;
        }
        for op in self.deltas(self.cursor, to) {
            self.apply(&op);
        }
        self.cursor = to;
    }

    fn apply(&mut self, op: &EditOperation) {
        if let Err(e) = self.editor.apply_programmatic(op) {
            self.record_error(e.into());
        }
    }

    fn flush_steps(&mut self) {
        while let Some(op) = self.steps.pop_front() {
            self.apply(&op);
        }
    }

    /// Drop the tick source, then pause the video.
    fn pause(&mut self) {
        self.ticker = None;
        if self.state.playing {
            self.state.playing = false;
            if let Err(e) = self.video.pause() {
                self.record_error(e);
            }
        }
    }

    /// Start the video, then the tick source.
    fn resume(&mut self) {
        if let Err(e) = self.video.play() {
            self.record_error(e);
            return;
        }
        self.state.playing = true;
        self.ticker = Some(self.new_ticker());
        debug!(position = self.state.video_position, "Playback started");
    }

    fn halt(&mut self) {
        self.steps.clear();
        self.pause();
    }

    fn seek_video(&mut self, position: u64) {
        self.state.video_position = position;
        if let Err(e) = self.video.seek(position) {
            self.record_error(e);
        }
    }

    fn new_ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    }

    fn record_error(&mut self, error: ClientError) -> ClientError {
        warn!(session_id = ?self.session_id, error = %error, "Playback error");
        self.state.errors.push(error.to_string());
        error
    }
}
