use std::error;
use std::fmt;

/// A command that was recognised but could not be parsed.
#[derive(Debug)]
pub struct Error<'a> {
    pub input: &'a str,
    pub position: usize,
    pub source: Box<dyn error::Error + Send>,
}

impl PartialEq for Error<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.input == other.input && self.position == other.position
    }
}

impl error::Error for Error<'_> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&*self.source)
    }
}

impl Error<'_> {
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let space = 10;
        let end = std::cmp::min(self.input.len(), self.position + space);
        let start = self.position.saturating_sub(space);
        // Offsets are byte based; widen the window to the nearest char boundaries.
        let start = (0..=start)
            .rev()
            .find(|i| self.input.is_char_boundary(*i))
            .unwrap_or(0);
        let end = (end..=self.input.len())
            .find(|i| self.input.is_char_boundary(*i))
            .unwrap_or(self.input.len());
        write!(
            f,
            "...'{}' | error: {} at >| '{}'...",
            &self.input[start..self.position],
            self.source,
            &self.input[self.position..end],
        )
    }
}
