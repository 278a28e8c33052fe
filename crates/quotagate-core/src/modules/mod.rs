pub mod config;
pub mod logger;
pub mod store;
mod store_memory;
mod store_pg;
