/// A [`Page`] is a batch of consecutive lines of an object, in the order they appear on it.
///
/// All pages of an object have the same number of lines, except the last one,
/// which may be shorter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub(crate) lines: Vec<String>,
    number: usize,
    offset: usize,
}

impl Page {
    /// Returns a new [`Page`].
    pub fn new(lines: Vec<String>, number: usize, offset: usize) -> Self {
        Self {
            lines,
            number,
            offset,
        }
    }

    /// The lines of this page
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The zero-based position of this page in the sequence of pages
    pub fn number(&self) -> usize {
        self.number
    }

    /// The zero-based position of the first line of this page among all paginated lines
    /// (i.e. not counting header lines).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The number of lines of this page
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether this page has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the lines of this page
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl<'a> IntoIterator for &'a Page {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
