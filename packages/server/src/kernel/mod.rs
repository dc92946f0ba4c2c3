//! Kernel module - server infrastructure and dependencies.

pub mod browser_handle;
pub mod deps;
pub mod epub_writer;
pub mod job_cache;
pub mod trace_layer;
pub mod trace_registry;

pub use browser_handle::BrowserHandle;
pub use deps::ServerDeps;
pub use epub_writer::{BaseEpubWriter, Book, BookChapter, PackagingError, ZipEpubWriter};
pub use job_cache::{CacheError, JobCache, JobResult};
pub use trace_layer::TraceForwardLayer;
pub use trace_registry::{
    ChannelHandle, ChannelMessage, ChannelUnavailable, TraceRegistry, TraceState,
};
