//! Lazy iteration over cursor-paginated remote collections.
//!
//! A [`Paginator`] pulls one page at a time from a [`PageSource`] and never prefetches,
//! so searches that stop early (see [`Paginator::find_first`]) never pay for pages
//! they don't look at.

use crate::Result;
use async_trait::async_trait;

/// One batch of items plus the cursor for the next batch, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, next: Option<String>) -> Self {
        Self { items, next }
    }

    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Fetches pages of a remote collection.
///
/// The first call receives `None`; later calls receive the cursor returned with the
/// previous page. Errors are passed through to the caller unchanged.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Item>>;
}

#[derive(Debug)]
enum Position {
    Start,
    At(String),
    Exhausted,
}

/// Pull-based iterator over the pages produced by a [`PageSource`].
#[derive(Debug)]
pub struct Paginator<S> {
    source: S,
    position: Position,
    pages_fetched: u32,
}

impl<S: PageSource> Paginator<S> {
    pub const fn new(source: S) -> Self {
        Self {
            source,
            position: Position::Start,
            pages_fetched: 0,
        }
    }

    /// Number of pages requested from the source so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the collection is exhausted.
    ///
    /// The sequence ends after an empty page or a page without a continuation cursor.
    pub async fn next_page(&mut self) -> Result<Option<Vec<S::Item>>> {
        let cursor = match &self.position {
            Position::Exhausted => return Ok(None),
            Position::Start => None,
            Position::At(cursor) => Some(cursor.as_str()),
        };

        let page = self.source.fetch_page(cursor).await?;
        self.pages_fetched += 1;

        if page.items.is_empty() {
            self.position = Position::Exhausted;
            return Ok(None);
        }

        self.position = page.next.map_or(Position::Exhausted, Position::At);
        Ok(Some(page.items))
    }

    /// Return the first item matching `predicate`, fetching no further pages once found.
    pub async fn find_first<P>(&mut self, mut predicate: P) -> Result<Option<S::Item>>
    where
        P: FnMut(&S::Item) -> bool + Send,
    {
        while let Some(items) = self.next_page().await? {
            if let Some(item) = items.into_iter().find(|item| predicate(item)) {
                return Ok(Some(item));
            }
        }

        Ok(None)
    }

    /// Count the items matching `predicate` across every page.
    pub async fn count_where<P>(&mut self, mut predicate: P) -> Result<u64>
    where
        P: FnMut(&S::Item) -> bool + Send,
    {
        let mut count = 0;
        while let Some(items) = self.next_page().await? {
            count += items.iter().filter(|item| predicate(item)).count() as u64;
        }

        Ok(count)
    }

    /// Read the whole collection.
    pub async fn collect_all(&mut self) -> Result<Vec<S::Item>> {
        let mut all = Vec::new();
        while let Some(items) = self.next_page().await? {
            all.extend(items);
        }

        Ok(all)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicU32, Ordering};
    use ohno::app_err;
    use std::sync::Mutex;

    /// Serves `pages` pages of three numbered items each, recording every cursor it sees.
    #[derive(Debug, Default)]
    struct NumberedPages {
        pages: u32,
        fail_on: Option<u32>,
        fetches: AtomicU32,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl NumberedPages {
        fn new(pages: u32) -> Self {
            Self { pages, ..Self::default() }
        }
    }

    #[async_trait]
    impl PageSource for NumberedPages {
        type Item = u32;

        async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<u32>> {
            let _ = self.fetches.fetch_add(1, Ordering::SeqCst);
            self.cursors.lock().unwrap().push(cursor.map(ToString::to_string));

            let page: u32 = cursor.map_or(Ok(1), str::parse).map_err(|e| app_err!("bad cursor: {e}"))?;
            if self.fail_on == Some(page) {
                return Err(app_err!("page {page} unavailable"));
            }

            let items = ((page - 1) * 3..page * 3).collect();
            let next = (page < self.pages).then(|| (page + 1).to_string());
            Ok(Page::new(items, next))
        }
    }

    #[tokio::test]
    async fn find_first_stops_at_matching_page() {
        let mut pages = Paginator::new(NumberedPages::new(5));

        // item 4 lives on page 2
        let found = pages.find_first(|n| *n == 4).await.unwrap();

        assert_eq!(found, Some(4));
        assert_eq!(pages.pages_fetched(), 2);
        assert_eq!(pages.source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(
            *pages.source.cursors.lock().unwrap(),
            vec![None, Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn find_first_without_match_reads_everything() {
        let mut pages = Paginator::new(NumberedPages::new(5));

        assert_eq!(pages.find_first(|n| *n > 100).await.unwrap(), None);
        assert_eq!(pages.pages_fetched(), 5);
    }

    #[tokio::test]
    async fn count_where_scans_all_pages() {
        let mut pages = Paginator::new(NumberedPages::new(4));

        let evens = pages.count_where(|n| n % 2 == 0).await.unwrap();

        assert_eq!(evens, 6);
        assert_eq!(pages.pages_fetched(), 4);
    }

    #[tokio::test]
    async fn collect_all_flattens_pages_in_order() {
        let mut pages = Paginator::new(NumberedPages::new(3));

        assert_eq!(pages.collect_all().await.unwrap(), (0..9).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn exhausted_paginator_stays_exhausted() {
        let mut pages = Paginator::new(NumberedPages::new(1));

        assert!(pages.next_page().await.unwrap().is_some());
        assert!(pages.next_page().await.unwrap().is_none());
        assert!(pages.next_page().await.unwrap().is_none());
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn empty_page_ends_sequence_even_with_cursor() {
        #[derive(Debug)]
        struct EmptyWithCursor;

        #[async_trait]
        impl PageSource for EmptyWithCursor {
            type Item = u32;

            async fn fetch_page(&self, _cursor: Option<&str>) -> Result<Page<u32>> {
                Ok(Page::new(Vec::new(), Some("again".to_string())))
            }
        }

        let mut pages = Paginator::new(EmptyWithCursor);
        assert!(pages.collect_all().await.unwrap().is_empty());
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn page_errors_propagate() {
        let source = NumberedPages {
            fail_on: Some(2),
            ..NumberedPages::new(5)
        };
        let mut pages = Paginator::new(source);

        let err = pages.count_where(|_| true).await.unwrap_err();
        assert!(err.to_string().contains("page 2 unavailable"));
    }
}
