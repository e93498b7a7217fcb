//! Generation states and the simulated loading progression.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::classify::ErrorState;
use crate::error::StylesError;
use crate::normalize::GeneratedResult;

/// Named phase of simulated progress shown while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadingStage {
    /// Attempt just started.
    Preparing,
    /// Images on their way.
    Uploading,
    /// Model looking at the images.
    Processing,
    /// Model producing output.
    Generating,
    /// Almost done.
    Finishing,
}

impl LoadingStage {
    /// Progress shown for this stage, in percent.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Self::Preparing => 10,
            Self::Uploading => 25,
            Self::Processing => 50,
            Self::Generating => 80,
            Self::Finishing => 95,
        }
    }

    /// Status line shown for this stage.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Preparing => "Preparing images for AI processing...",
            Self::Uploading => "Uploading images to the AI service...",
            Self::Processing => "AI is analyzing your images...",
            Self::Generating => "Creating your personalized outfit...",
            Self::Finishing => "Finalizing your generated image...",
        }
    }
}

impl fmt::Display for LoadingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preparing => "preparing",
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Generating => "generating",
            Self::Finishing => "finishing",
        })
    }
}

/// When each stage begins, measured from the start of an attempt.
///
/// The schedule is independent of real progress; it only paces the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSchedule {
    steps: Vec<(LoadingStage, Duration)>,
}

impl StageSchedule {
    /// Build a schedule from `(stage, offset)` pairs.
    ///
    /// # Errors
    ///
    /// The schedule must start with a zero offset, list stages in increasing
    /// order and never move an offset backwards.
    pub fn new(steps: Vec<(LoadingStage, Duration)>) -> Result<Self, StylesError> {
        match steps.first() {
            Some((_, offset)) if offset.is_zero() => {}
            _ => return Err(StylesError::InvalidArgument("stage schedule must start at zero".to_string())),
        }
        if steps.windows(2).any(|pair| pair[0].0 >= pair[1].0 || pair[0].1 > pair[1].1) {
            return Err(StylesError::InvalidArgument(
                "stage schedule must advance through stages in order".to_string(),
            ));
        }
        Ok(Self { steps })
    }

    /// Stages with their offsets, in order. The first offset is always zero.
    #[must_use]
    pub fn steps(&self) -> &[(LoadingStage, Duration)] {
        &self.steps
    }
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            steps: vec![
                (LoadingStage::Preparing, Duration::ZERO),
                (LoadingStage::Uploading, Duration::from_secs(1)),
                (LoadingStage::Processing, Duration::from_secs(2)),
                (LoadingStage::Generating, Duration::from_secs(8)),
                (LoadingStage::Finishing, Duration::from_secs(15)),
            ],
        }
    }
}

/// Progress of the attempt currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStatus {
    /// Identity of the attempt; results from other attempts are ignored.
    pub attempt: u64,
    /// Stage currently displayed.
    pub stage: LoadingStage,
    /// When the attempt started.
    pub started_at: Instant,
}

impl LoadingStatus {
    /// Time since the attempt started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Lifecycle state of a session.
///
/// A result exists only in [`GenerationState::Success`] and an error only in
/// [`GenerationState::Error`], so both are absent while idle or loading.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationState {
    /// Nothing in flight, nothing to show.
    #[default]
    Idle,
    /// An attempt is in flight.
    Loading(LoadingStatus),
    /// The last attempt succeeded.
    Success(GeneratedResult),
    /// The last attempt failed.
    Error(ErrorState),
}

impl GenerationState {
    /// Short name of the state.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading(_) => "loading",
            Self::Success(_) => "success",
            Self::Error(_) => "error",
        }
    }

    /// True while an attempt is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading(_))
    }

    /// The result, in the success state.
    #[must_use]
    pub fn result(&self) -> Option<&GeneratedResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    /// The error, in the error state.
    #[must_use]
    pub fn error(&self) -> Option<&ErrorState> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Current stage, while loading.
    #[must_use]
    pub fn stage(&self) -> Option<LoadingStage> {
        match self {
            Self::Loading(status) => Some(status.stage),
            _ => None,
        }
    }
}
