pub mod append;
pub mod follow;
