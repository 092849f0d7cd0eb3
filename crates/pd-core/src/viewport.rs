//! Cursor and scroll arithmetic for a window of rows over a longer list.

use std::ops::Range;

/// Direction for paging and horizontal scrolling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards the first item, or the left edge.
    Backward,
    /// Towards the last item, or the right edge.
    Forward,
}

/// Columns taken by the cursor gutter and the scrollbar.
const ROW_CHROME: usize = 4;

/// Scroll state of a list.
///
/// `cursor` always stays inside `offset..offset + visible_height` while the
/// list is non-empty, and `offset` never exceeds `item_count - visible_height`.
/// An empty list has no selection, see [`Viewport::selected`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewport {
    cursor: usize,
    offset: usize,
    h_offset: usize,
    visible_height: usize,
    header_rows: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Viewport {
    /// Create a viewport that reserves `header_rows` rows of its total height.
    pub fn new(header_rows: usize) -> Self {
        Self {
            cursor: 0,
            offset: 0,
            h_offset: 0,
            visible_height: 1,
            header_rows,
        }
    }

    /// Index of the highlighted row.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Index of the first row on screen.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Columns scrolled off the left edge.
    pub fn h_offset(&self) -> usize {
        self.h_offset
    }

    /// Rows available for items.
    pub fn visible_height(&self) -> usize {
        self.visible_height
    }

    /// Rows reserved above the items.
    pub fn header_rows(&self) -> usize {
        self.header_rows
    }

    /// Height including header rows.
    pub fn total_height(&self) -> usize {
        self.visible_height + self.header_rows
    }

    /// Selected index, or `None` for an empty list.
    pub fn selected(&self, item_count: usize) -> Option<usize> {
        (item_count > 0).then(|| self.cursor.min(item_count - 1))
    }

    /// Move the cursor by `delta` rows, clamped to the list.
    pub fn move_cursor(&mut self, delta: isize, item_count: usize) {
        if item_count == 0 {
            self.reset();
            return;
        }
        let last = item_count - 1;
        let target = self.cursor.saturating_add_signed(delta);
        self.cursor = target.min(last);
        self.ensure_visible(item_count);
    }

    /// Move the cursor by one page.
    pub fn page_move(&mut self, direction: Direction, item_count: usize) {
        let page = isize::try_from(self.visible_height).unwrap_or(isize::MAX);
        match direction {
            Direction::Backward => self.move_cursor(-page, item_count),
            Direction::Forward => self.move_cursor(page, item_count),
        }
    }

    /// Select the first row.
    pub fn jump_home(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    /// Select the last row, showing a full page above it.
    pub fn jump_end(&mut self, item_count: usize) {
        self.cursor = item_count.saturating_sub(1);
        self.offset = self.max_offset(item_count);
    }

    /// Scroll the page itself by `delta` rows, keeping the cursor on the top
    /// visible row. Used by views without a selection.
    pub fn scroll_by(&mut self, delta: isize, item_count: usize) {
        self.offset = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset(item_count));
        self.cursor = self.offset;
        self.ensure_visible(item_count);
    }

    /// Place the cursor on `index` and scroll it into view.
    pub fn set_cursor(&mut self, index: usize, item_count: usize) {
        self.cursor = index;
        self.ensure_visible(item_count);
    }

    /// Scroll one column, stopping when the end of the widest item reaches the
    /// right edge. The limit keeps one column for the left overflow marker.
    pub fn scroll_horizontal(
        &mut self,
        direction: Direction,
        max_content_width: usize,
        view_width: usize,
    ) {
        match direction {
            Direction::Backward => self.h_offset = self.h_offset.saturating_sub(1),
            Direction::Forward => {
                let content_width = view_width.saturating_sub(ROW_CHROME);
                let limit = (max_content_width + 1).saturating_sub(content_width);
                if self.h_offset < limit {
                    self.h_offset += 1;
                }
            }
        }
    }

    /// Apply a new total height and drop dead space below the last item.
    pub fn resize(&mut self, total_height: usize, item_count: usize) {
        self.visible_height = total_height.saturating_sub(self.header_rows).max(1);
        self.offset = self.offset.min(self.max_offset(item_count));
        self.ensure_visible(item_count);
    }

    /// Clamp the cursor to the list and adjust the offset minimally so the
    /// cursor row is on screen.
    pub fn ensure_visible(&mut self, item_count: usize) {
        if item_count == 0 {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        self.cursor = self.cursor.min(item_count - 1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.visible_height {
            self.offset = self.cursor + 1 - self.visible_height;
        }
        self.offset = self.offset.min(self.max_offset(item_count));
    }

    /// Return to the first row without touching the horizontal scroll.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.offset = 0;
    }

    /// Indices of the rows currently on screen.
    pub fn visible_range(&self, item_count: usize) -> Range<usize> {
        let start = self.offset.min(item_count);
        let end = (self.offset + self.visible_height).min(item_count);
        start..end
    }

    /// True when the list is taller than the viewport.
    pub fn is_scrollable(&self, item_count: usize) -> bool {
        item_count > self.visible_height
    }

    /// Scrollbar thumb as `(start, len)` within a track of `visible_height`
    /// rows. When nothing scrolls the whole track is the thumb.
    pub fn scrollbar(&self, item_count: usize) -> (usize, usize) {
        let height = self.visible_height;
        if !self.is_scrollable(item_count) {
            return (0, height);
        }
        let thumb_len = (height * height / item_count).max(1);
        let scroll_range = item_count - height;
        let thumb_range = height - thumb_len;
        let thumb_start = self.offset.min(scroll_range) * thumb_range / scroll_range;
        (thumb_start, thumb_len)
    }

    fn max_offset(&self, item_count: usize) -> usize {
        item_count.saturating_sub(self.visible_height)
    }
}
