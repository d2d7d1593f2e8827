//! # Holiday poster core
//!
//! Every invitation gets one square on a shared 8×9 grid poster. An upload is
//! normalized into a 650px tile, the invitation's square is assigned (once,
//! race-safely), and the tile is composited onto the current poster, which is
//! then republished together with a downscaled preview.
//!
//! Stores are passed in as `Arc<dyn RecordStore>` / `Arc<dyn BlobStore>`;
//! in-memory and local-filesystem implementations ship with the crate.

pub mod allocator;
pub mod blob_store;
mod codec;
pub mod compositor;
pub mod error;
pub mod geometry;
pub mod normalizer;
pub mod publisher;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod submission;
pub mod types;

pub use allocator::SquareAllocator;
pub use blob_store::{BlobStore, LocalBlobStore, MemoryBlobStore};
pub use compositor::Compositor;
pub use error::{PosterError, StoreError};
pub use geometry::Square;
pub use publisher::{PosterPublisher, PublishedPoster};
pub use store::RecordStore;
pub use store_file::FileRecordStore;
pub use store_memory::MemoryRecordStore;
pub use submission::{SubmissionReceipt, SubmissionService};
pub use types::{Invitation, PosterConfig, Submission};
