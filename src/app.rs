//! Cooperative scheduler
//!
//! One thread, two repeating tasks: the effect task runs one scan pass per
//! turn, the presentation task copies the buffer out whenever its refresh
//! deadline has passed. Commands are applied between turns, so a pass is
//! never interrupted and always sees one consistent parameter set.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::command::{Command, CommandSource, STRENGTH_STEP, THRESHOLD_STEP};
use crate::display::{DisplayError, InputEvent, Key, PixelBuffer, Presenter};
use crate::effect::{
    CancelToken, EffectError, EffectLoop, EffectParameters, LoopState, Orientation, ParamChange,
    ParameterController,
};
use crate::image_source::{self, ImageLoadError};

/// Longest sleep while there is nothing to compute
const IDLE_SLEEP: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Image(#[from] ImageLoadError),

    #[error(transparent)]
    Effect(#[from] EffectError),

    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Where the pixels come from
#[derive(Debug, Clone)]
pub struct ImageSpec {
    pub source: Option<PathBuf>,
    pub fallback: PathBuf,
}

/// Optional bounds on a run; without them the loop runs until cancelled
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    pub max_passes: Option<u64>,
    pub max_duration: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u64,
    pub frames: u64,
    pub elapsed: Duration,
}

pub struct App<P: Presenter> {
    effect: EffectLoop,
    controller: ParameterController,
    presenter: P,
    sources: Vec<Box<dyn CommandSource>>,
    image: ImageSpec,
    reload_on_commit: bool,
    frames: u64,
    next_present: Instant,
}

impl<P: Presenter> App<P> {
    pub fn new(presenter: P, params: EffectParameters, image: ImageSpec) -> Self {
        Self {
            effect: EffectLoop::new(),
            controller: ParameterController::new(params),
            presenter,
            sources: Vec::new(),
            image,
            reload_on_commit: false,
            frames: 0,
            next_present: Instant::now(),
        }
    }

    /// Refill the buffer from the source after every committed change
    pub fn with_reload_on_commit(mut self, enabled: bool) -> Self {
        self.reload_on_commit = enabled;
        self
    }

    pub fn add_source(&mut self, source: Box<dyn CommandSource>) {
        self.sources.push(source);
    }

    pub fn effect(&self) -> &EffectLoop {
        &self.effect
    }

    pub fn params(&self) -> &EffectParameters {
        self.controller.params()
    }

    /// Direct access for adjustments that bypass commands
    pub fn controller_mut(&mut self) -> &mut ParameterController {
        &mut self.controller
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.effect.cancel_token()
    }

    /// Load the source image (or its fallback) and start the effect.
    /// On failure the loop stays idle and the error is returned.
    pub fn start(&mut self) -> Result<(), AppError> {
        if let Err(e) = self.load_image() {
            tracing::error!(error = %e, "No usable image, effect stays idle");
            return Err(e.into());
        }
        self.effect.start()?;
        self.present()?;
        Ok(())
    }

    fn load_image(&mut self) -> Result<(), ImageLoadError> {
        let buffer =
            image_source::load_with_fallback(self.image.source.as_deref(), &self.image.fallback)?;
        self.install(buffer);
        Ok(())
    }

    fn install(&mut self, buffer: PixelBuffer) {
        self.effect.load(buffer, self.controller.params().orientation);
        // A fresh image always gets a freshly remapped threshold
        self.controller.rebuild();
    }

    /// Switch sources. The new path only becomes the reload source once it
    /// has produced a buffer.
    fn switch_source(&mut self, path: PathBuf) {
        match image_source::load_with_fallback(Some(&path), &self.image.fallback) {
            Ok(buffer) => {
                self.image.source = Some(path);
                self.install(buffer);
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path.display(), "Load failed, keeping current image");
            }
        }
    }

    /// Reload without giving up the running buffer if every image fails
    fn reload(&mut self) {
        if let Err(e) = self.load_image() {
            tracing::error!(error = %e, "Reload failed, keeping current image");
        }
    }

    fn commit(&mut self, change: ParamChange) {
        self.controller.commit(change);
        if self.reload_on_commit {
            self.reload();
        }
    }

    /// Apply one operator command
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::SetStrength(v) => self.commit(ParamChange::Strength(v)),
            Command::SetThreshold(v) => self.commit(ParamChange::Threshold(v)),
            Command::SetVertical(v) => {
                self.commit(ParamChange::Orientation(Orientation::from_vertical(v)));
            }
            Command::ToggleOrientation => {
                let change = self.controller.toggle_orientation();
                self.commit(change);
            }
            Command::NudgeStrength(delta) => {
                let change = self.controller.nudge_strength(delta);
                self.commit(change);
            }
            Command::NudgeThreshold(delta) => {
                let change = self.controller.nudge_tuning(delta);
                self.commit(change);
            }
            Command::Pause => self.effect.pause(),
            Command::Resume => self.effect.resume(),
            Command::TogglePause => self.effect.toggle_pause(),
            Command::Reload => self.reload(),
            Command::Load(path) => self.switch_source(path),
            Command::Quit => {
                tracing::info!("Quit requested");
                self.effect.cancel_token().cancel();
            }
        }
    }

    fn handle_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Quit => self.apply(Command::Quit),
            InputEvent::Resized { width, height } => self.controller.on_resize(width, height),
            InputEvent::KeyDown(key) => {
                let command = match key {
                    Key::Up => Command::NudgeStrength(STRENGTH_STEP),
                    Key::Down => Command::NudgeStrength(-STRENGTH_STEP),
                    Key::Right => Command::NudgeThreshold(THRESHOLD_STEP),
                    Key::Left => Command::NudgeThreshold(-THRESHOLD_STEP),
                    Key::V => Command::ToggleOrientation,
                    Key::R => Command::Reload,
                    Key::Space => Command::TogglePause,
                    Key::Escape => Command::Quit,
                };
                self.apply(command);
            }
        }
    }

    fn drain_commands(&mut self) {
        for event in self.presenter.poll_events() {
            self.handle_event(&event);
        }
        let commands: Vec<Command> = self.sources.iter_mut().flat_map(|s| s.poll()).collect();
        for command in commands {
            self.apply(command);
        }
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        if let Some(buffer) = self.effect.buffer() {
            self.presenter.present(buffer)?;
            self.frames += 1;
        }
        self.next_present = Instant::now() + self.presenter.refresh_interval();
        Ok(())
    }

    /// One scheduler turn: commands, at most one pass, presentation if due.
    /// Returns whether a pass ran.
    pub fn turn(&mut self) -> Result<bool, AppError> {
        self.drain_commands();

        let ran = self.effect.step(self.controller.params()).is_some();

        if Instant::now() >= self.next_present {
            self.present()?;
        }
        Ok(ran)
    }

    /// Run turns until cancelled or a limit is reached
    pub fn run(&mut self, limits: RunLimits) -> Result<RunSummary, AppError> {
        let started = Instant::now();
        let cancel = self.effect.cancel_token();
        let first_pass = self.effect.passes();

        while !cancel.is_cancelled() {
            let ran = self.turn()?;

            let passes = self.effect.passes() - first_pass;
            if limits.max_passes.is_some_and(|max| passes >= max)
                || limits.max_duration.is_some_and(|max| started.elapsed() >= max)
            {
                tracing::info!(passes, "Run limit reached");
                break;
            }

            if ran {
                // Let other threads (control listeners) get a look in
                thread::yield_now();
            } else {
                if self.effect.state() == LoopState::Idle {
                    tracing::warn!("Effect is not running, leaving scheduler");
                    break;
                }
                let wait = self.next_present.saturating_duration_since(Instant::now());
                thread::sleep(wait.min(IDLE_SLEEP));
            }
        }

        // Show the final state of the last pass
        self.present()?;

        let summary = RunSummary {
            passes: self.effect.passes() - first_pass,
            frames: self.frames,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            passes = summary.passes,
            frames = summary.frames,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Effect stopped"
        );
        Ok(summary)
    }
}
