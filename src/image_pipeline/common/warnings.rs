//! Non-fatal conditions raised while developing an image.

use std::fmt;

use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Gray-world statistics found no usable samples for a channel; a neutral
    /// multiplier was used instead.
    ZeroChannelSum { channel: usize },
    /// Camera multipliers are missing a channel or not positive.
    CameraWhiteBalanceUnusable,
    /// Matrix white balance was requested but the color matrix is missing
    /// or does not yield positive channel responses.
    MatrixWhiteBalanceUnusable,
    /// A listed bad pixel has no same-color neighbour within radius 2.
    BadPixelUnrecoverable { col: usize, row: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ZeroChannelSum { channel } => write!(
                f,
                "channel {channel} has no usable samples, using a neutral multiplier"
            ),
            Warning::CameraWhiteBalanceUnusable => {
                write!(f, "camera white balance unusable, falling back to gray world")
            }
            Warning::MatrixWhiteBalanceUnusable => {
                write!(f, "color matrix gives no daylight balance, falling back to gray world")
            }
            Warning::BadPixelUnrecoverable { col, row } => {
                write!(f, "bad pixel at ({col}, {row}) has no usable neighbours")
            }
        }
    }
}

/// Accumulates warnings for one image.
#[derive(Debug, Default, Clone)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs the warning and keeps it for the caller.
    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.items.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.items.iter()
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.items.contains(warning)
    }
}
