//! Echo-suppressed scroll mirroring between the editor and the preview.
//!
//! A user scroll on one pane forces the other pane to the same offset. That
//! forced scroll fires its own scroll event, which must not be mirrored back.
//! `ScrollLink` arms a single `pending` flag when it issues a forced scroll and
//! consumes it on the echo.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pane {
    Editor,
    Preview,
}

impl Pane {
    pub fn counterpart(self) -> Self {
        match self {
            Pane::Editor => Pane::Preview,
            Pane::Preview => Pane::Editor,
        }
    }
}

/// The other pane's current offset and the largest offset it can reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollPos {
    pub offset: i32,
    pub max: i32,
}

impl ScrollPos {
    /// Offset the browser would settle on when asked for `offset`.
    fn clamp(self, offset: i32) -> i32 {
        offset.clamp(0, self.max.max(0))
    }
}

/// A forced scroll the caller must apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mirror {
    pub target: Pane,
    pub offset: i32,
}

#[derive(Clone, Debug, Default)]
pub struct ScrollLink {
    pending: bool,
}

impl ScrollLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a scroll event from `source` now at `offset`.
    ///
    /// A forced scroll that leaves the other pane where it is fires no scroll
    /// event. That includes a pane already at its maximum being asked to go
    /// further, so the offset is clamped to `counterpart.max` first and nothing
    /// is mirrored when it would not move.
    pub fn on_scroll(&mut self, source: Pane, offset: i32, counterpart: ScrollPos) -> Option<Mirror> {
        if self.pending {
            self.pending = false;
            return None;
        }
        let target = counterpart.clamp(offset);
        if target == counterpart.offset {
            return None;
        }
        self.pending = true;
        Some(Mirror {
            target: source.counterpart(),
            offset: target,
        })
    }
}
