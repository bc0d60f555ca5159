//! Continuous pass scheduler
//!
//! The loop owns the pixel buffer and its scan geometry. It does not own a
//! thread: the host calls [`EffectLoop::step`] once per scheduler turn and
//! each call runs at most one full pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::geometry::ScanGeometry;
use super::params::{EffectParameters, Orientation};
use super::scan::{scan_pass, PassStats};
use crate::display::PixelBuffer;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EffectError {
    #[error("No image has been loaded, effect cannot start")]
    NoImage,

    #[error("Effect loop was cancelled")]
    Cancelled,
}

/// Cloneable stop signal shared between the loop and whoever wants it to end
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Paused,
}

/// A buffer and the geometry derived from it. Swapped as one unit.
#[derive(Debug, Clone)]
struct Frame {
    buffer: PixelBuffer,
    geometry: ScanGeometry,
}

impl Frame {
    fn new(buffer: PixelBuffer, orientation: Orientation) -> Self {
        let geometry = ScanGeometry::new(buffer.width(), buffer.height(), orientation);
        Self { buffer, geometry }
    }
}

pub struct EffectLoop {
    state: LoopState,
    current: Option<Frame>,
    pending: Option<Frame>,
    passes: u64,
    cancel: CancelToken,
}

impl EffectLoop {
    pub fn new() -> Self {
        Self::with_cancel_token(CancelToken::new())
    }

    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self {
            state: LoopState::Idle,
            current: None,
            pending: None,
            passes: 0,
            cancel,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running && !self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Total passes run since creation
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// The buffer as of the last completed pass
    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.current.as_ref().map(|f| &f.buffer)
    }

    pub fn geometry(&self) -> Option<&ScanGeometry> {
        self.current.as_ref().map(|f| &f.geometry)
    }

    /// True while a loaded buffer hasn't been swapped in yet
    pub fn has_pending_load(&self) -> bool {
        self.pending.is_some()
    }

    /// Queue a new buffer. It replaces the current one, together with a
    /// freshly derived geometry, at the next pass boundary.
    pub fn load(&mut self, buffer: PixelBuffer, orientation: Orientation) {
        tracing::debug!(
            width = buffer.width(),
            height = buffer.height(),
            %orientation,
            "Buffer queued"
        );
        self.pending = Some(Frame::new(buffer, orientation));
        if self.state == LoopState::Paused {
            // A paused loop runs no passes, so there is no boundary to wait for
            self.apply_pending();
        }
    }

    /// Idle → Running. Starting a running loop does nothing.
    pub fn start(&mut self) -> Result<(), EffectError> {
        if self.cancel.is_cancelled() {
            return Err(EffectError::Cancelled);
        }
        match self.state {
            LoopState::Running => return Ok(()),
            LoopState::Paused => {
                self.resume();
                return Ok(());
            }
            LoopState::Idle => {}
        }

        self.apply_pending();
        let Some(frame) = &self.current else {
            tracing::error!("Effect not started: no image loaded");
            return Err(EffectError::NoImage);
        };

        tracing::info!(
            width = frame.buffer.width(),
            height = frame.buffer.height(),
            pairs = frame.geometry.pair_count(),
            "Effect started"
        );
        self.state = LoopState::Running;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == LoopState::Running {
            self.state = LoopState::Paused;
            tracing::info!(passes = self.passes, "Effect paused");
        }
    }

    pub fn resume(&mut self) {
        if self.state == LoopState::Paused {
            self.state = LoopState::Running;
            tracing::info!("Effect resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.state {
            LoopState::Running => self.pause(),
            LoopState::Paused => self.resume(),
            LoopState::Idle => {}
        }
    }

    /// Run one pass with the current parameter values.
    ///
    /// Pending loads and orientation changes are applied first, so a pass
    /// never sees a buffer and a geometry that don't belong together.
    /// Returns `None` when no pass ran.
    pub fn step(&mut self, params: &EffectParameters) -> Option<PassStats> {
        if !self.is_running() {
            return None;
        }

        self.apply_pending();
        let frame = self.current.as_mut()?;

        if frame.geometry.orientation != params.orientation {
            frame.geometry =
                ScanGeometry::new(frame.buffer.width(), frame.buffer.height(), params.orientation);
            tracing::debug!(orientation = %params.orientation, "Scan geometry recomputed");
        }

        let stats = scan_pass(&mut frame.buffer, &frame.geometry, params);
        self.passes += 1;
        Some(stats)
    }

    fn apply_pending(&mut self) {
        if let Some(frame) = self.pending.take() {
            tracing::info!(
                width = frame.buffer.width(),
                height = frame.buffer.height(),
                "Buffer swapped in"
            );
            self.current = Some(frame);
        }
    }
}

impl Default for EffectLoop {
    fn default() -> Self {
        Self::new()
    }
}
