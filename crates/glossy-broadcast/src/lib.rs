//! Periodic broadcast of the motion-derived offset to visual components.

mod broadcaster;
pub mod registry;
pub mod ticker;

pub use broadcaster::{Broadcaster, BroadcasterState};
pub use registry::{ObserverToken, Offsetable, Registry};
pub use ticker::{IntervalTicker, ManualTicker, TickHandle, Ticker};
