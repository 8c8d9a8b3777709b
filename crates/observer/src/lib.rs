//! Observation: turning the live page into a symbolic state report plus a
//! catalog of addressable elements.

pub mod catalog;
pub mod extract;
pub mod observer;

pub use catalog::{Catalog, CatalogEntry, Observation};
pub use extract::{PageSnapshot, RawElement, ELEMENT_ARENA_BINDING};
pub use observer::{Observer, ObserverError};
