//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     table.get / handle / group("/v1").get
//!     → pattern.rs (parse and validate the pattern)
//!     → group.rs (prefix join, strip-prefix wrapper)
//!     → table.rs (radix-keyed entry + sorted scan list)
//!
//! Incoming Request (method, path):
//!     → snapshot.rs (load the active table)
//!     → table.rs (exact lookup, then longest-first scan)
//!     → pattern.rs (capture path parameters)
//!     → Return: Matched, MethodNotAllowed or NotFound
//! ```
//!
//! # Design Decisions
//! - Tables are built mutably, then frozen behind an `Arc`
//! - No regex anywhere; patterns are a byte-level two-pointer match
//! - Deterministic: the longest matching pattern wins, ties keep
//!   registration order

pub mod group;
pub mod path;
pub mod pattern;
pub mod radix;
pub mod snapshot;
pub mod table;

pub use group::Group;
pub use pattern::{match_path, PathParams, Pattern, PatternError};
pub use radix::RadixTree;
pub use snapshot::SharedRoutes;
pub use table::{
    Resolution, RouteEntry, RouteError, RouteInfo, RouteKind, RouteMatch, RouteMethod, RouteTable,
};
