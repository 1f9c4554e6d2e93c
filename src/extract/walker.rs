//! Page walker.
//!
//! Visits pages in document order, numbers them from 1 and hands each
//! selected page to the extraction strategy chosen for the pass.

use std::collections::VecDeque;

use crate::config::{ContentKind, ExtractConfig};
use crate::error::Result;
use crate::model::ExtractedItem;
use crate::parser::{PdfDocument, PdfPage};

use super::{images, text};

/// 1-indexed position of a page in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PageOrdinal(u32);

impl PageOrdinal {
    /// The ordinal of the most recently visited page (0 before the first).
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Move to the next page and return its ordinal.
    pub fn advance(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Extraction strategy, fixed for the whole pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Images,
    Text,
}

impl From<ContentKind> for Strategy {
    fn from(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Image => Strategy::Images,
            ContentKind::Text => Strategy::Text,
        }
    }
}

impl Strategy {
    fn dispatch(
        self,
        page: &PdfPage<'_>,
        ordinal: u32,
        config: &ExtractConfig,
    ) -> Result<Vec<ExtractedItem>> {
        match self {
            Strategy::Images => Ok(images::collect(page, ordinal, config)?
                .into_iter()
                .map(ExtractedItem::Image)
                .collect()),
            Strategy::Text => {
                let item = text::extract_page(page, ordinal, &config.capture_region)?;
                Ok(vec![ExtractedItem::Text(item)])
            }
        }
    }
}

/// Iterator over the items of one extraction pass.
///
/// Yields items in page order, then resource-table order within a page. The
/// first error is yielded once and ends the iteration.
pub struct PageWalker<'a> {
    pages: std::vec::IntoIter<PdfPage<'a>>,
    config: &'a ExtractConfig,
    strategy: Strategy,
    ordinal: PageOrdinal,
    pending: VecDeque<ExtractedItem>,
    finished: bool,
}

impl<'a> PageWalker<'a> {
    pub fn new(doc: &'a PdfDocument, config: &'a ExtractConfig) -> Self {
        Self {
            pages: doc.pages().collect::<Vec<_>>().into_iter(),
            config,
            strategy: Strategy::from(config.content),
            ordinal: PageOrdinal::default(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Ordinal of the last page visited.
    pub fn ordinal(&self) -> PageOrdinal {
        self.ordinal
    }
}

impl Iterator for PageWalker<'_> {
    type Item = Result<ExtractedItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Some(Ok(item));
            }
            if self.finished {
                return None;
            }

            let Some(page) = self.pages.next() else {
                self.finished = true;
                return None;
            };
            let ordinal = self.ordinal.advance();

            if !self.config.pages.includes(ordinal) {
                log::debug!("Page {}: not selected", ordinal);
                continue;
            }
            log::debug!("Page {}: extracting {:?}", ordinal, self.strategy);

            match self.strategy.dispatch(&page, ordinal, self.config) {
                Ok(items) => self.pending.extend(items),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl std::iter::FusedIterator for PageWalker<'_> {}

/// Run a whole pass and collect its items.
pub fn walk(doc: &PdfDocument, config: &ExtractConfig) -> Result<Vec<ExtractedItem>> {
    PageWalker::new(doc, config).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_ordinal_advances_from_one() {
        let mut ordinal = PageOrdinal::default();
        assert_eq!(ordinal.get(), 0);
        assert_eq!(ordinal.advance(), 1);
        assert_eq!(ordinal.advance(), 2);
        assert_eq!(ordinal.get(), 2);
    }

    #[test]
    fn test_strategy_from_content_kind() {
        assert_eq!(Strategy::from(ContentKind::Image), Strategy::Images);
        assert_eq!(Strategy::from(ContentKind::Text), Strategy::Text);
    }
}
