//! Download engine: a resumable, sequential transfer of every layer of one
//! image into a single archive, reporting progress through event channels.

pub mod events;
pub mod session;

pub use events::{EventChannel, Listener, SubscriptionId};
pub use session::{DownloadSession, StartOutcome};
