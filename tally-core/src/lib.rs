pub mod analytics;
pub mod domain;
pub mod engine;
pub mod export;
pub mod format;
pub mod import;
pub mod rates;
pub mod store;
