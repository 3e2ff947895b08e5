//! Thumbview engine: worker pool, scheduling and archive extraction.
mod archive;
mod compression;
mod decode;
mod generator;
mod persist;
mod pool;
mod scheduler;
mod sink;
mod types;

pub use archive::{ExtractError, ExtractionService, TarArchive};
pub use compression::{seekable_tar, Compression};
pub use decode::{decode_entry_name, DecodeError, DecodedName, NameEncoding};
pub use generator::{FnGenerator, GenerateError, ThumbnailGenerator};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pool::{PoolError, Task, WorkerPool};
pub use scheduler::{SchedulerError, ThumbnailScheduler};
pub use sink::ResultSink;
pub use types::{Merge, UnitStatus, WorkResult};
