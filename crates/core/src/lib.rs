pub mod asset;
pub mod chain;
pub mod config;
pub mod error;
pub mod gateway;
pub mod money;
pub mod oracle;
pub mod quote;
pub mod sync;
pub mod transfer;
