pub mod broker;
pub mod config;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod relay;
pub mod server;
pub mod store;
