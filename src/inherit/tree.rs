//! In-memory page store that materializes ancestor chains

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::page::{Page, PageId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageTreeError {
    #[error("page {0} not found")]
    NotFound(PageId),

    #[error("cycle in parent links at page {0}")]
    Cycle(PageId),
}

/// Pages keyed by id
#[derive(Debug, Clone, Default)]
pub struct PageTree {
    pages: HashMap<PageId, Page>,
}

impl PageTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page, returning the one it replaced
    pub fn insert(&mut self, page: Page) -> Option<Page> {
        self.pages.insert(page.id, page)
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub fn get_mut(&mut self, id: PageId) -> Option<&mut Page> {
        self.pages.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page ids in ascending order
    pub fn ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.pages.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Ancestors of `id`, root first and ending at its parent. The walk
    /// never takes more steps than there are pages.
    pub fn ancestors(&self, id: PageId) -> Result<Vec<Page>, PageTreeError> {
        let page = self.get(id).ok_or(PageTreeError::NotFound(id))?;

        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut next = page.parent_id;

        while let Some(parent_id) = next {
            if !seen.insert(parent_id) || chain.len() >= self.pages.len() {
                return Err(PageTreeError::Cycle(parent_id));
            }
            let parent = self.get(parent_id).ok_or(PageTreeError::NotFound(parent_id))?;
            chain.push(parent.clone());
            next = parent.parent_id;
        }

        chain.reverse();
        Ok(chain)
    }
}

impl FromIterator<Page> for PageTree {
    fn from_iter<I: IntoIterator<Item = Page>>(iter: I) -> Self {
        let mut tree = PageTree::new();
        for page in iter {
            tree.insert(page);
        }
        tree
    }
}
