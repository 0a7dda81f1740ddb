use crate::error::{Error, Result};

/// An [`Iterator`] adapter that discards the first `header_lines` lines of `iter`.
///
/// The lines are discarded on the first call to `next`. If `iter` has fewer lines than
/// `header_lines`, it returns [`Error::UnexpectedEndOfStream`].
/// After the first error, it returns `None`.
#[derive(Debug)]
pub struct HeaderSkipper<I> {
    iter: I,
    header_lines: usize,
    remaining: usize,
    finished: bool,
}

impl<I: Iterator<Item = Result<String>>> HeaderSkipper<I> {
    /// Returns a new [`HeaderSkipper`].
    pub fn new(iter: I, header_lines: usize) -> Self {
        Self {
            iter,
            header_lines,
            remaining: header_lines,
            finished: false,
        }
    }

    /// Returns the inner iterator
    pub fn into_inner(self) -> I {
        self.iter
    }

    fn skip_header(&mut self) -> Result<()> {
        while self.remaining > 0 {
            match self.iter.next() {
                Some(line) => {
                    let line = line?;
                    log::debug!(
                        "Skipping header line {}: {:?}",
                        self.header_lines - self.remaining + 1,
                        line
                    );
                    self.remaining -= 1;
                }
                None => {
                    return Err(Error::UnexpectedEndOfStream {
                        expected: self.header_lines,
                        found: self.header_lines - self.remaining,
                    })
                }
            }
        }
        Ok(())
    }
}

impl<I: Iterator<Item = Result<String>>> Iterator for HeaderSkipper<I> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.remaining > 0 {
            if let Err(e) = self.skip_header() {
                self.finished = true;
                return Some(Err(e));
            }
        }
        let maybe_line = self.iter.next();
        if matches!(maybe_line, Some(Err(_))) {
            self.finished = true;
        }
        maybe_line
    }
}
