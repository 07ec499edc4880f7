pub mod indicators;
pub mod quota;
pub mod sessions;
