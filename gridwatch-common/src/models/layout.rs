// File: gridwatch-common/src/models/layout.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::models::stream::StreamId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1920, height: 1080 }
    }
}

impl FromStr for Viewport {
    type Err = String;
    /// Parses `"1280x720"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Viewport must look like WIDTHxHEIGHT, got '{}'", s))?;
        let width = w.trim().parse::<u32>().map_err(|e| format!("bad width '{}': {}", w, e))?;
        let height = h.trim().parse::<u32>().map_err(|e| format!("bad height '{}': {}", h, e))?;
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// ceil(sqrt(n)) columns, filled row by row.
    #[default]
    Grid,
    /// First stream large, the rest in a strip along the bottom.
    Focus,
    /// First stream full-bleed, the rest as small overlays in the corner.
    PictureInPicture,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutMode::Grid => write!(f, "grid"),
            LayoutMode::Focus => write!(f, "focus"),
            LayoutMode::PictureInPicture => write!(f, "pip"),
        }
    }
}

impl FromStr for LayoutMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(LayoutMode::Grid),
            "focus" => Ok(LayoutMode::Focus),
            "pip" | "picture_in_picture" => Ok(LayoutMode::PictureInPicture),
            _ => Err(format!("Unknown layout mode: {}", s)),
        }
    }
}

/// A rectangle in viewport pixels assigned to exactly one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub stream_id: StreamId,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Derived geometry for the whole session. Always replaced as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub mode: LayoutMode,
    pub columns: u32,
    pub rows: u32,
    pub slots: Vec<Slot>,
}

impl LayoutPlan {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_for(&self, stream_id: StreamId) -> Option<(usize, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, s)| s.stream_id == stream_id)
    }
}

/// What the layout store persists between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedLayout {
    pub mode: LayoutMode,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}
