//! Page lifecycle tracking.
//!
//! The manager owns the set of open pages, the LIFO return stack used to
//! restore focus when a tab closes, and the active-page pointer. It is the
//! only component that mutates any of those; everything else reads through
//! it once per step.

use std::collections::HashSet;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::CloseParams;
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use chromiumoxide::{Browser, Page};
use tracing::{debug, info, warn};

use crate::dialogs::DialogWatcher;
use crate::errors::ContextError;

/// URL substrings that mark a freshly opened page as an ad popup worth
/// closing without asking the planner.
const POPUP_DENYLIST: &[&str] = &["googleads", "doubleclick", "facebook.com/tr"];

/// How long a brand-new page gets to finish its first load before we read
/// its URL for the denylist check.
const FIRST_LOAD_GRACE: Duration = Duration::from_millis(1_500);

pub struct ContextManager {
    /// Present when this agent launched (and owns) the browser; absent in
    /// hosted mode where a single external page is driven.
    browser: Option<Browser>,
    pages: Vec<Page>,
    return_stack: Vec<TargetId>,
    active: Option<TargetId>,
    known: HashSet<TargetId>,
    dialogs: DialogWatcher,
}

impl ContextManager {
    /// Enumerate the pages already open in the context, focus the first one
    /// and start watching for dialogs on it.
    pub async fn new(browser: Browser, dialogs: DialogWatcher) -> Result<Self, ContextError> {
        let mut manager = Self {
            browser: Some(browser),
            pages: Vec::new(),
            return_stack: Vec::new(),
            active: None,
            known: HashSet::new(),
            dialogs,
        };
        manager.sync().await?;
        Ok(manager)
    }

    /// Hosted mode: track a single externally owned page. New tabs opened by
    /// that page cannot be discovered without the browser handle, so the
    /// page set stays fixed.
    pub async fn for_page(page: Page, dialogs: DialogWatcher) -> Result<Self, ContextError> {
        dialogs.attach(&page).await?;
        let id = page.target_id().clone();
        Ok(Self {
            browser: None,
            pages: vec![page],
            return_stack: vec![id.clone()],
            active: Some(id.clone()),
            known: HashSet::from([id]),
            dialogs,
        })
    }

    pub fn dialogs(&self) -> &DialogWatcher {
        &self.dialogs
    }

    /// The page the next observation should read. Reconciles the page set
    /// first, so new tabs have been focused and closed tabs popped.
    pub async fn active_page(&mut self) -> Result<Page, ContextError> {
        self.sync().await?;
        let active = self.active.clone().ok_or(ContextError::NoPages)?;
        self.pages
            .iter()
            .find(|p| *p.target_id() == active)
            .cloned()
            .ok_or(ContextError::NoPages)
    }

    /// Reconcile with the browser's real page set: adopt new pages (closing
    /// denylisted popups), drop closed ones, and repair the active pointer.
    pub async fn sync(&mut self) -> Result<(), ContextError> {
        let Some(browser) = self.browser.as_mut() else {
            return Ok(());
        };
        let _ = browser.fetch_targets().await;
        let current = browser.pages().await.map_err(ContextError::driver)?;

        let current_ids: HashSet<TargetId> =
            current.iter().map(|p| p.target_id().clone()).collect();

        // Pages that disappeared since the last sync.
        let closed: Vec<Page> = self
            .pages
            .iter()
            .filter(|p| !current_ids.contains(p.target_id()))
            .cloned()
            .collect();
        for page in &closed {
            self.on_page_closed(page);
        }
        self.pages.retain(|p| current_ids.contains(p.target_id()));

        // Pages we have never seen.
        for page in current {
            if self.known.contains(page.target_id()) {
                continue;
            }
            self.on_new_page(page).await?;
        }

        // Repair the active pointer if its page vanished.
        if self
            .active
            .as_ref()
            .map(|id| !current_ids.contains(id))
            .unwrap_or(true)
        {
            self.restore_previous().await?;
        }

        Ok(())
    }

    async fn on_new_page(&mut self, page: Page) -> Result<(), ContextError> {
        self.known.insert(page.target_id().clone());

        // Give the page a moment to land on its real URL before judging it.
        let _ = tokio::time::timeout(FIRST_LOAD_GRACE, page.wait_for_navigation()).await;
        let url = page.url().await.ok().flatten().unwrap_or_default();

        if url != "about:blank" && POPUP_DENYLIST.iter().any(|deny| url.contains(deny)) {
            info!(%url, "auto-closing ad popup");
            let _ = page.execute(CloseParams::default()).await;
            return Ok(());
        }

        debug!(%url, "adopting new page");
        if let Err(err) = page.bring_to_front().await {
            warn!("bring_to_front failed for new page: {err}");
        }
        self.dialogs.attach(&page).await?;
        self.return_stack.push(page.target_id().clone());
        self.active = Some(page.target_id().clone());
        self.pages.push(page);
        Ok(())
    }

    fn on_page_closed(&mut self, page: &Page) {
        let id = page.target_id();
        debug!(?id, "page closed");
        self.return_stack.retain(|entry| entry != id);
        self.known.remove(id);
        self.dialogs.forget_for_page(page);
    }

    /// Point `active` at the top of the return stack, or the last page still
    /// open, or nothing.
    async fn restore_previous(&mut self) -> Result<(), ContextError> {
        let open: HashSet<TargetId> = self.pages.iter().map(|p| p.target_id().clone()).collect();
        self.return_stack.retain(|id| open.contains(id));

        let next = self
            .return_stack
            .last()
            .cloned()
            .or_else(|| self.pages.last().map(|p| p.target_id().clone()));

        if let Some(id) = &next {
            if let Some(page) = self.pages.iter().find(|p| *p.target_id() == *id) {
                if let Err(err) = page.bring_to_front().await {
                    warn!("bring_to_front failed while restoring focus: {err}");
                }
            }
        }
        self.active = next;
        Ok(())
    }

    /// Activate a tab by zero-based index into the open-page list.
    pub async fn switch_by_index(&mut self, index: usize) -> Result<Page, ContextError> {
        self.sync().await?;
        if index >= self.pages.len() {
            return Err(ContextError::TabIndexOutOfRange {
                index,
                count: self.pages.len(),
            });
        }
        let page = self.pages[index].clone();
        self.activate(&page).await?;
        Ok(page)
    }

    /// Activate the first tab whose title or URL contains the query,
    /// scanning the return stack from the most recently focused page down.
    pub async fn switch_by_query(&mut self, query: &str) -> Result<Page, ContextError> {
        self.sync().await?;

        let mut ordered: Vec<Page> = Vec::new();
        for id in self.return_stack.iter().rev() {
            if let Some(page) = self.pages.iter().find(|p| *p.target_id() == *id) {
                ordered.push(page.clone());
            }
        }
        for page in &self.pages {
            if !ordered.iter().any(|p| p.target_id() == page.target_id()) {
                ordered.push(page.clone());
            }
        }

        for page in ordered {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            let title = page
                .evaluate("document.title")
                .await
                .ok()
                .and_then(|result| result.into_value::<String>().ok())
                .unwrap_or_default();
            if url.contains(query) || title.contains(query) {
                self.activate(&page).await?;
                return Ok(page);
            }
        }
        Err(ContextError::TabNotFound(query.to_string()))
    }

    async fn activate(&mut self, page: &Page) -> Result<(), ContextError> {
        page.bring_to_front().await.map_err(ContextError::driver)?;
        let id = page.target_id().clone();
        self.return_stack.retain(|entry| *entry != id);
        self.return_stack.push(id.clone());
        self.active = Some(id);
        Ok(())
    }

    /// Close the active tab; focus falls back to the previous stack entry.
    pub async fn close_active(&mut self) -> Result<(), ContextError> {
        let page = self.active_page().await?;
        page.execute(CloseParams::default())
            .await
            .map_err(ContextError::driver)?;
        self.sync().await
    }

    /// Shut the owned browser down, if there is one. No-op in hosted mode.
    pub async fn close_browser(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                warn!("browser close failed: {err}");
            }
            let _ = browser.wait().await;
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Index of the active page in the open-page list.
    pub fn active_index(&self) -> Option<usize> {
        let active = self.active.as_ref()?;
        self.pages.iter().position(|p| *p.target_id() == *active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_denylist_entries() {
        let blocked = [
            "https://googleads.g.doubleclick.net/pagead/ads",
            "https://www.facebook.com/tr?id=1",
        ];
        for url in blocked {
            assert!(POPUP_DENYLIST.iter().any(|d| url.contains(d)), "{url}");
        }
        assert!(!POPUP_DENYLIST.iter().any(|d| "https://example.com".contains(d)));
        assert!(!POPUP_DENYLIST.iter().any(|d| "about:blank".contains(d)));
    }
}
