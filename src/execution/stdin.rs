//! Sequential line source feeding a single execution request.

/// Hands out stdin lines in submission order.
///
/// A cursor is created per request and never shared. Once every line has been handed
/// out, further reads yield `None` and the position stays at the end.
#[derive(Debug, Clone, Default)]
pub struct StdinCursor {
    lines: Vec<String>,
    position: usize,
}

impl StdinCursor {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines, position: 0 }
    }

    pub fn next_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.position)?.clone();
        self.position += 1;
        Some(line)
    }

    /// Number of lines consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(lines: &[&str]) -> StdinCursor {
        StdinCursor::new(lines.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn yields_lines_in_order_then_nothing() {
        let mut c = cursor(&["a", "b", "c"]);
        assert_eq!(c.next_line().as_deref(), Some("a"));
        assert_eq!(c.next_line().as_deref(), Some("b"));
        assert_eq!(c.next_line().as_deref(), Some("c"));
        for _ in 0..5 {
            assert_eq!(c.next_line(), None);
        }
        assert_eq!(c.position(), 3);
        assert!(c.is_exhausted());
    }

    #[test]
    fn empty_cursor_is_exhausted_from_the_start() {
        let mut c = StdinCursor::default();
        assert!(c.is_exhausted());
        assert_eq!(c.next_line(), None);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn lines_are_returned_verbatim() {
        let mut c = cursor(&["  padded  ", ""]);
        assert_eq!(c.next_line().as_deref(), Some("  padded  "));
        assert_eq!(c.next_line().as_deref(), Some(""));
        assert!(c.is_exhausted());
    }
}
