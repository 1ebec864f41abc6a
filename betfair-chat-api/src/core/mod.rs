pub mod agent;
pub mod config;
pub mod conversation;
pub mod memory;
pub mod storage;
