//! Domain services for Sentinel Watch.
//!
//! Services contain the logic that operates on domain models through the
//! [`IncidentStore`] and [`ChangeSource`] seams.

pub mod change_feed;
pub mod memory;
pub mod resolution;
pub mod store;
pub mod view_sync;

pub use change_feed::{
    ChangeChannel, ChangeChannelHandle, ChangeKind, ChangeSource, ChangeStream, ChannelState,
    Delivery, IncidentChange, ReconnectPolicy, Subscription,
};
pub use memory::{InMemoryChangeSource, InMemoryIncidentStore, StoreOp};
pub use resolution::{resolve_incident, ResolveOutcome};
pub use store::{load_timeline, IncidentStore};
pub use view_sync::{MountedView, ViewSynchronizer};
