//! Byte ranges into a schema file, carried by tokens and parse errors.

/// Half-open byte range `start..end` inside the schema source.
///
/// Attributes carry the range from `@` to their closing token so errors
/// can point at the offending line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// First byte of the range.
    pub start: usize,
    /// One past the last byte of the range.
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of source bytes covered.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest range containing both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Text of the schema under this range; empty when out of bounds.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_line_span() {
        let source = "  title String @unique\n";
        let name = Span::new(2, 7);
        let attr = Span::new(15, 22);
        let line = name.cover(attr);
        assert_eq!(line.slice(source), "title String @unique");
        assert_eq!(line.len(), 20);
        assert!(!line.is_empty());
    }

    #[test]
    fn test_cover_is_order_independent() {
        let model = Span::new(0, 5);
        let brace = Span::new(40, 41);
        assert_eq!(model.cover(brace), brace.cover(model));
    }

    #[test]
    fn test_empty_and_out_of_range() {
        let source = "model User {}";
        assert!(Span::default().is_empty());
        assert_eq!(Span::new(6, 10).slice(source), "User");
        assert_eq!(Span::new(6, 100).slice(source), "");
    }
}
