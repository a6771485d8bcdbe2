//! draw-sync: keep tournament brackets in step with the official draw pages
//!
//! Commands:
//! - sync: scrape every active draw and write the differences to the backend
//! - scrape: extract one draw page and print the result

pub mod error;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod output;
pub mod reconcile;
pub mod schema;
pub mod scrape;
pub mod store;
pub mod sync;

pub use error::SyncError;
pub use extract::{extract, Extraction, Site};
pub use fetch::{AnyFetcher, FetchConfig, FetchMode, Fetcher, FixtureFetcher, ProxyFetcher};
pub use model::{Draw, SeedMap, Set, Slot, SlotKey};
pub use reconcile::{reconcile, ChangeSet, NewSet};
pub use store::{DrawStore, PocketBaseStore};
pub use sync::{sync_all, sync_draw, SyncReport};
