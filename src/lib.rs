pub mod chew;
pub mod cli;
pub mod config;
pub mod imap;
pub mod logging;
pub mod repository;
pub mod store;
pub mod sync;
