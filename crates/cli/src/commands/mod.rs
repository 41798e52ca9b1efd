pub mod append;
pub mod follow;
pub mod server;
