use super::tree::Span;
use crate::model::LinePosition;

/// Maps between byte offsets and zero-based line positions of a text.
///
/// Line positions count characters, so non-ASCII text earlier on a line does not
/// shift the columns an editor sees.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            text: text.to_string(),
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, offset: usize) -> LinePosition {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |prefix| prefix.chars().count());
        LinePosition::new(line as u32, column as u32)
    }

    /// The byte offset of `position`. The column is clamped to the line's length;
    /// a line past the end of the text yields `None`.
    pub fn offset(&self, position: LinePosition) -> Option<usize> {
        let line = position.line as usize;
        let start = *self.line_starts.get(line)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());
        let column = self.text[start..line_end]
            .char_indices()
            .nth(position.offset as usize)
            .map_or(line_end - start, |(byte, _)| byte);
        Some(start + column)
    }

    pub fn end_position(&self) -> LinePosition {
        self.position(self.text.len())
    }

    pub fn span(&self, start_offset: usize, end_offset: usize) -> Span {
        Span {
            start: self.position(start_offset),
            end: self.position(end_offset),
            start_offset,
            end_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_count_characters() {
        let index = LineIndex::new("s = \"héllo\"; x\nñ = 1;");
        let x = "s = \"héllo\"; x".len() - 1;
        assert_eq!(index.position(x), LinePosition::new(0, 13));
        assert_eq!(index.offset(LinePosition::new(0, 13)), Some(x));
        assert_eq!(index.offset(LinePosition::new(0, 99)), Some(x + 1));
        assert_eq!(index.end_position(), LinePosition::new(1, 6));
    }
}
