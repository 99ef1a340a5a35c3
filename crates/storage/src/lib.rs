#![forbid(unsafe_code)]

mod chain;
mod clock;
mod index;
mod resolve;
mod store;
mod version;

pub use chain::VersionChain;
pub use clock::{Clock, ManualClock, SystemClock};
pub use index::{OrderingPolicy, StoreIndex};
pub use resolve::{Resolution, resolve, resolve_detailed};
pub use store::{Store, StoreConfig, Ttl};
pub use version::Version;

pub use evokv_common::{StoreError, Timestamp};
