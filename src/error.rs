use crate::player::PlaybackState;

pub type PlayerResult<T> = Result<T, PlayerError>;

#[derive(thiserror::Error, Debug)]
pub enum PlayerError {
    #[error("source preparation failed: {0}")]
    SourcePreparationFailed(String),

    #[error("malformed raster frame {width}x{height}: {reason}")]
    RasterMalformed {
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("invalid playback config: {0}")]
    InvalidConfig(String),

    #[error("player cannot start from state {0:?}")]
    AlreadyStarted(PlaybackState),

    #[error("terminal write failed: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}

impl PlayerError {
    pub fn preparation(msg: impl Into<String>) -> Self {
        Self::SourcePreparationFailed(msg.into())
    }

    pub fn malformed(width: usize, height: usize, reason: impl Into<String>) -> Self {
        Self::RasterMalformed {
            width,
            height,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Why a frame index could not be served. This ends playback; it is not a failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameUnavailable {
    #[error("no frame at index {index}")]
    EndOfStream { index: u64 },

    #[error("frame {index} could not be read: {reason}")]
    Unreadable { index: u64, reason: String },
}
