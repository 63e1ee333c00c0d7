pub mod sync_actor;

pub use sync_actor::*;
