//! Run-length grouping of thresholded cells into colored text segments.

use serde::{Deserialize, Serialize};

use crate::threshold::{ColorGrid, HexColor};

/// Drawn for every visible cell.
pub const BLOCK_GLYPH: char = '\u{2587}';
/// Figure space; same advance as [`BLOCK_GLYPH`] in the game font.
pub const BLANK_GLYPH: char = '\u{2007}';
pub const ROW_BREAK: char = '\n';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub color: HexColor,
}

/// Ordered segments in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Vec<Segment>);

impl Document {
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Document {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Streaming state of a single scan.
///
/// A segment is flushed only when a visible cell arrives whose color differs
/// from the last visible color, so blanks always stay attached to the run
/// that precedes them (or to the first run, when they lead).
struct RunEncoder {
    strip_trailing_blank: bool,
    color: Option<HexColor>,
    text: String,
    segments: Vec<Segment>,
}

impl RunEncoder {
    fn new(strip_trailing_blank: bool) -> Self {
        Self {
            strip_trailing_blank,
            color: None,
            text: String::new(),
            segments: Vec::new(),
        }
    }

    fn push(&mut self, cell: Option<HexColor>) {
        match cell {
            Some(color) => {
                if let Some(current) = self.color {
                    if current != color {
                        self.segments.push(Segment {
                            text: std::mem::take(&mut self.text),
                            color: current,
                        });
                    }
                }
                self.color = Some(color);
                self.text.push(BLOCK_GLYPH);
            }
            None => self.text.push(BLANK_GLYPH),
        }
    }

    fn break_row(&mut self) {
        self.strip_tail();
        self.text.push(ROW_BREAK);
    }

    fn strip_tail(&mut self) {
        if self.strip_trailing_blank {
            let kept = self.text.trim_end_matches(BLANK_GLYPH).len();
            self.text.truncate(kept);
        }
    }

    fn finish(mut self) -> Document {
        self.strip_tail();
        if let Some(color) = self.color {
            if !self.text.is_empty() {
                self.segments.push(Segment {
                    text: self.text,
                    color,
                });
            }
        }
        Document(self.segments)
    }
}

/// Scans `grid` row by row and groups cells into segments.
pub fn encode(grid: &ColorGrid, strip_trailing_blank: bool) -> Document {
    let mut encoder = RunEncoder::new(strip_trailing_blank);
    for (y, row) in grid.rows().enumerate() {
        if y > 0 {
            encoder.break_row();
        }
        for &cell in row {
            encoder.push(cell);
        }
    }
    let document = encoder.finish();
    log::debug!(
        "encoded {}x{} grid into {} segments",
        grid.width(),
        grid.height(),
        document.len()
    );
    document
}
