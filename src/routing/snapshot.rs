//! Shared, swappable route table.
//!
//! Requests load the current table once and keep that `Arc` for the whole
//! dispatch, so a concurrent `replace` never changes routes under an
//! in-flight request. Changing routes at runtime means building a new
//! table and swapping it in.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::table::RouteTable;

/// Copy-on-write holder of the active [`RouteTable`].
#[derive(Debug)]
pub struct SharedRoutes {
    current: ArcSwap<RouteTable>,
}

impl SharedRoutes {
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from(Arc::new(table)),
        }
    }

    /// The table in effect right now.
    pub fn load(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Install `table` and return the one it replaced.
    pub fn replace(&self, table: RouteTable) -> Arc<RouteTable> {
        let routes = table.len();
        let previous = self.current.swap(Arc::new(table));
        tracing::info!(
            routes,
            previous_routes = previous.len(),
            "Route table replaced"
        );
        previous
    }
}
