//! Dataset collaborator layer.
//!
//! The engine reads data only through this layer:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              TileService                │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            DatasetRegistry              │
//! │      (LRU pool of opened handles)       │
//! └────────────────────┬────────────────────┘
//!                      │ DatasetOpener::open
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             Dataset Trait               │
//! │     metadata() + fetch(FetchRequest)    │
//! └────────────────────┬────────────────────┘
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  signal track   │    │   contact matrix    │
//! │ (dense bins)    │    │ (sparse records)    │
//! └─────────────────┘    └─────────────────────┘
//! ```

mod registry;
mod source;

pub use registry::{DatasetOpener, DatasetRegistry};
pub use source::{
    ContactRecord, DataKind, Dataset, DatasetMetadata, FetchRequest, FetchedValues, TilesetInfo,
    DEFAULT_MATRIX_TILE_EDGE, DEFAULT_VECTOR_TILE_EDGE,
};
