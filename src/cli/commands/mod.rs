pub mod articles;
pub mod config;
pub mod init;
pub mod outline;
pub mod topics;
pub mod write;
