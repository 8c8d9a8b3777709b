//! The per-observation element catalog.

use std::collections::HashMap;

use chromiumoxide::Page;
use flashloop_core_types::ElementInfo;
use uuid::Uuid;

use crate::extract::ELEMENT_ARENA_BINDING;

/// One cataloged element: the serializable description plus its live handle
/// (an arena index valid only for this observation) and its center point in
/// root-viewport coordinates.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub info: ElementInfo,
    pub node_index: u32,
    pub center: (f64, f64),
}

/// Mapping from semantic ID to element descriptor for a single observation.
///
/// Handles live in the page-side arena; the catalog only carries indices.
/// The next observation installs a fresh arena, which releases every handle
/// here, and [`Catalog::release`] does the same explicitly.
pub struct Catalog {
    observation_id: Uuid,
    page: Page,
    entries: HashMap<String, CatalogEntry>,
    order: Vec<String>,
}

impl Catalog {
    pub fn new(page: Page, ordered: Vec<(String, CatalogEntry)>) -> Self {
        let order = ordered.iter().map(|(id, _)| id.clone()).collect();
        Self {
            observation_id: Uuid::new_v4(),
            page,
            entries: ordered.into_iter().collect(),
            order,
        }
    }

    pub fn observation_id(&self) -> Uuid {
        self.observation_id
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Semantic IDs in document order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the page-side arena so no element handle outlives the catalog.
    /// Bounded: a page whose scripting is paused (open dialog, hung frame)
    /// must not stall the loop.
    pub async fn release(&self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            self.page
                .evaluate(format!("window.{ELEMENT_ARENA_BINDING} = []; true")),
        )
        .await;
    }
}

/// What one observation hands to the planner and the executor.
pub struct Observation {
    /// Compact textual description of the page for the LLM.
    pub state_text: String,
    /// Addressable elements backing the IDs mentioned in `state_text`.
    pub catalog: Catalog,
}

