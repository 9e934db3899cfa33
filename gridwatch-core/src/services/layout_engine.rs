// File: gridwatch-core/src/services/layout_engine.rs
//
// Pure slot geometry. Same inputs, same plan; the engine never reorders.

use gridwatch_common::models::{LayoutMode, LayoutPlan, Slot, StreamId, Viewport};

pub const MIN_SLOT_WIDTH: u32 = 320;
pub const MIN_SLOT_HEIGHT: u32 = 180;

const TARGET_ASPECT: f64 = 16.0 / 9.0;
const PIP_MARGIN: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayoutEngine {
    pub min_slot_width: u32,
    pub min_slot_height: u32,
}

impl Default for GridLayoutEngine {
    fn default() -> Self {
        Self {
            min_slot_width: MIN_SLOT_WIDTH,
            min_slot_height: MIN_SLOT_HEIGHT,
        }
    }
}

/// [`GridLayoutEngine::compute`] with the default minimum slot size.
pub fn compute_layout(stream_ids: &[StreamId], viewport: Viewport, mode: LayoutMode) -> LayoutPlan {
    GridLayoutEngine::default().compute(stream_ids, viewport, mode)
}

impl GridLayoutEngine {
    /// Slots are assigned to `stream_ids` in order. For focus and
    /// picture-in-picture the first id is the featured stream.
    pub fn compute(&self, stream_ids: &[StreamId], viewport: Viewport, mode: LayoutMode) -> LayoutPlan {
        let n = stream_ids.len();
        if n == 0 {
            return LayoutPlan { mode, columns: 0, rows: 0, slots: Vec::new() };
        }
        if n == 1 {
            return LayoutPlan {
                mode,
                columns: 1,
                rows: 1,
                slots: vec![slot(stream_ids[0], 0, 0, viewport.width, viewport.height)],
            };
        }
        if viewport.width < self.min_slot_width {
            return stacked(stream_ids, viewport, mode);
        }

        match mode {
            LayoutMode::Grid => self.grid(stream_ids, viewport),
            LayoutMode::Focus => self.focus(stream_ids, viewport),
            LayoutMode::PictureInPicture => picture_in_picture(stream_ids, viewport),
        }
    }

    /// Near-square grid. The width minimum always holds: cells narrower than
    /// `min_slot_width` fall back to a single column. Rows shorter than
    /// `min_slot_height` collapse into a single row, but only while that row
    /// still keeps every cell at least `min_slot_width` wide; otherwise the
    /// short cells are kept.
    fn grid(&self, ids: &[StreamId], viewport: Viewport) -> LayoutPlan {
        let n = ids.len() as u32;
        let (mut columns, mut rows) = if n == 2 {
            pair_orientation(viewport)
        } else {
            let columns = ceil_sqrt(n);
            (columns, n.div_ceil(columns))
        };

        if viewport.width / columns < self.min_slot_width {
            return stacked(ids, viewport, LayoutMode::Grid);
        }
        if rows > 1
            && viewport.height / rows < self.min_slot_height
            && viewport.width / n >= self.min_slot_width
        {
            (columns, rows) = (n, 1);
        }

        let w = viewport.width / columns;
        let h = viewport.height / rows;
        let slots = ids
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let i = i as u32;
                slot(*id, (i % columns) * w, (i / columns) * h, w, h)
            })
            .collect();
        LayoutPlan { mode: LayoutMode::Grid, columns, rows, slots }
    }

    /// Featured stream across the top three quarters, the rest in a strip
    /// underneath that wraps once cells would drop below the minimum width.
    fn focus(&self, ids: &[StreamId], viewport: Viewport) -> LayoutPlan {
        let strip_h = viewport.height / 4;
        let main_h = viewport.height - strip_h;
        let secondary = (ids.len() - 1) as u32;

        let fit = (viewport.width / self.min_slot_width).max(1);
        let strip_cols = secondary.min(fit);
        let strip_rows = secondary.div_ceil(strip_cols);
        let w = viewport.width / strip_cols;
        let h = strip_h / strip_rows;

        let mut slots = Vec::with_capacity(ids.len());
        slots.push(slot(ids[0], 0, 0, viewport.width, main_h));
        for (i, id) in ids[1..].iter().enumerate() {
            let i = i as u32;
            slots.push(slot(*id, (i % strip_cols) * w, main_h + (i / strip_cols) * h, w, h));
        }
        LayoutPlan { mode: LayoutMode::Focus, columns: strip_cols, rows: 1 + strip_rows, slots }
    }
}

/// Featured stream full-bleed; the others as quarter-size overlays stacked
/// upwards from the bottom-right corner, continuing leftwards when a column
/// is full.
fn picture_in_picture(ids: &[StreamId], viewport: Viewport) -> LayoutPlan {
    let w = viewport.width / 4;
    let h = viewport.height / 4;
    let per_column = ((viewport.height.saturating_sub(PIP_MARGIN)) / (h + PIP_MARGIN)).max(1);

    let mut slots = Vec::with_capacity(ids.len());
    slots.push(slot(ids[0], 0, 0, viewport.width, viewport.height));
    for (i, id) in ids[1..].iter().enumerate() {
        let i = i as u32;
        let col = i / per_column;
        let row = i % per_column;
        let x = viewport.width.saturating_sub((w + PIP_MARGIN) * (col + 1));
        let y = viewport.height.saturating_sub((h + PIP_MARGIN) * (row + 1));
        slots.push(slot(*id, x, y, w, h));
    }
    LayoutPlan { mode: LayoutMode::PictureInPicture, columns: 1, rows: 1, slots }
}

/// Single column, one row per stream, used when the viewport is too narrow.
fn stacked(ids: &[StreamId], viewport: Viewport, mode: LayoutMode) -> LayoutPlan {
    let rows = ids.len() as u32;
    let h = viewport.height / rows;
    let slots = ids
        .iter()
        .enumerate()
        .map(|(i, id)| slot(*id, 0, i as u32 * h, viewport.width, h))
        .collect();
    LayoutPlan { mode, columns: 1, rows, slots }
}

/// Side-by-side or stacked, whichever keeps each half closer to 16:9.
/// Ties go to side-by-side.
fn pair_orientation(viewport: Viewport) -> (u32, u32) {
    let w = viewport.width as f64;
    let h = viewport.height.max(1) as f64;
    let side_by_side = aspect_distance((w / 2.0) / h);
    let over_under = aspect_distance(w / (h / 2.0));
    if over_under < side_by_side { (1, 2) } else { (2, 1) }
}

fn aspect_distance(aspect: f64) -> f64 {
    if aspect <= 0.0 {
        return f64::INFINITY;
    }
    (aspect / TARGET_ASPECT).ln().abs()
}

fn ceil_sqrt(n: u32) -> u32 {
    let mut c = 1;
    while c * c < n {
        c += 1;
    }
    c
}

fn slot(stream_id: StreamId, x: u32, y: u32, w: u32, h: u32) -> Slot {
    Slot { stream_id, x, y, w, h }
}
