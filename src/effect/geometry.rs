use super::params::Orientation;
use crate::display::pixel_buffer::BYTES_PER_PIXEL;

/// Traversal bounds for one scan pass, derived from buffer dimensions and
/// orientation. Recomputed explicitly on load and on orientation change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanGeometry {
    pub width: u32,
    pub height: u32,
    pub orientation: Orientation,
    /// Bytes per row
    pub row_stride: usize,
    /// Row blocks start at 0, `row_stride`, ... below this offset
    pub max_row_offset: usize,
    /// Column steps within a row block stay below `row start + this`
    pub max_column_offset: usize,
    /// Byte distance from a source pixel to the pixel it is compared with
    pub neighbor_offset: usize,
}

impl ScanGeometry {
    pub fn new(width: u32, height: u32, orientation: Orientation) -> Self {
        let row_stride = width as usize * BYTES_PER_PIXEL;
        let height = height as usize;

        let (max_row_offset, max_column_offset, neighbor_offset) = match orientation {
            Orientation::Vertical => (
                height.saturating_sub(1) * row_stride,
                row_stride,
                row_stride,
            ),
            Orientation::Horizontal => (
                height * row_stride,
                row_stride.saturating_sub(BYTES_PER_PIXEL),
                BYTES_PER_PIXEL,
            ),
        };

        Self {
            width,
            height: height as u32,
            orientation,
            row_stride,
            max_row_offset,
            max_column_offset,
            neighbor_offset,
        }
    }

    /// Number of adjacent pairs one pass visits
    pub fn pair_count(&self) -> usize {
        if self.row_stride == 0 {
            return 0;
        }
        (self.max_row_offset / self.row_stride) * (self.max_column_offset / BYTES_PER_PIXEL)
    }

    /// `(source, target)` byte offsets in pass order: row blocks top to
    /// bottom, pixels left to right within a block.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        // step_by(0) panics; a zero-width buffer has no rows to walk
        let row_step = self.row_stride.max(1);
        let rows = if self.row_stride == 0 {
            0..0
        } else {
            0..self.max_row_offset
        };
        rows.step_by(row_step).flat_map(move |row| {
            (row..row + self.max_column_offset)
                .step_by(BYTES_PER_PIXEL)
                .map(move |j| (j, j + self.neighbor_offset))
        })
    }
}
