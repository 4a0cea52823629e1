//! Ordered and observable queue primitives, plus the two concrete queues used
//! by the rest of the system: the play queue and the download queue.

mod download_job;
mod download_queue;
mod observable;
mod ordered;
mod play_queue;

pub use download_job::{BadJob, DownloadJob, MetadataOverride, PlaylistUpdate};
pub use download_queue::{DownloadQueue, DOWNLOAD_QUEUE_NAME};
pub use observable::ObservableQueue;
pub use ordered::OrderedQueue;
pub use play_queue::{PlayQueue, PLAY_QUEUE_NAME};

pub mod action {
    pub use crate::download_queue::action as download_queue;
    pub use crate::play_queue::action as play_queue;
}
