//! Query engine. All reads are over committed data only.
//!
//! Each module adds methods to `LedgerStore` via `impl LedgerStore` blocks.

pub mod hot;
pub mod lookup;
pub mod reconstruct;
pub mod timeline;

pub use hot::HotResource;
pub use lookup::FieldQuery;
pub use reconstruct::{fold_state, state_at};
pub use timeline::{TimeRange, Timeline, TimelineCursor, TimelinePage};
