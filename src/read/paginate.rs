use streaming_decompression::FallibleStreamingIterator;

use crate::error::{Error, Result};
use crate::page::Page;

/// A [`FallibleStreamingIterator`] that groups the lines of `iter` in [`Page`]s of
/// `page_size` lines. The last page holds the remaining lines.
///
/// Lines are pulled from `iter` one page at a time, and the page's buffer is
/// re-used across pages. A failure while assembling a page discards it.
pub struct Paginator<I: Iterator<Item = Result<String>>> {
    iter: I,
    page_size: usize,
    current: Option<Page>,
    // the buffer of the next page when there is no current page
    buffer: Vec<String>,
    pages: usize,
    lines: usize,
    finished: bool,
}

impl<I: Iterator<Item = Result<String>>> Paginator<I> {
    /// Returns a new [`Paginator`]
    /// # Error
    /// Errors iff `page_size` is zero
    pub fn try_new(iter: I, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::InvalidConfiguration(
                "the page size must be positive".to_string(),
            ));
        }
        Ok(Self {
            iter,
            page_size,
            current: None,
            buffer: vec![],
            pages: 0,
            lines: 0,
            finished: false,
        })
    }

    /// The number of pages produced so far
    pub fn pages_read(&self) -> usize {
        self.pages
    }

    /// The number of lines in the pages produced so far
    pub fn lines_read(&self) -> usize {
        self.lines
    }

    /// Returns the iterator of lines
    pub fn into_inner(self) -> I {
        self.iter
    }
}

impl<I: Iterator<Item = Result<String>>> FallibleStreamingIterator for Paginator<I> {
    type Item = Page;
    type Error = Error;

    fn advance(&mut self) -> Result<()> {
        let mut lines = if let Some(page) = self.current.take() {
            page.lines
        } else {
            std::mem::take(&mut self.buffer)
        };
        lines.clear();

        if self.finished {
            self.buffer = lines;
            return Ok(());
        }

        while lines.len() < self.page_size {
            match self.iter.next() {
                Some(Ok(line)) => lines.push(line),
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if lines.is_empty() {
            self.buffer = lines;
        } else {
            let length = lines.len();
            self.current = Some(Page::new(lines, self.pages, self.lines));
            self.pages += 1;
            self.lines += length;
        }
        Ok(())
    }

    fn get(&self) -> Option<&Self::Item> {
        self.current.as_ref()
    }
}
