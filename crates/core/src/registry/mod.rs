//! Per-path registries the dispatcher holds as explicit, `Arc`-shared
//! dependencies rather than process-global state: a mutex-guarded map
//! owned by the server and threaded through every session it spawns.

pub mod follower;
pub mod writer;
