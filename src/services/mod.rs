pub mod broadcaster;

pub use broadcaster::{BroadcastError, BroadcasterHandle, BroadcasterSettings, PublishedUpdate, UpdatePipeline};
