pub(crate) mod activities;
pub(crate) mod analytics;
pub(crate) mod clients;
pub(crate) mod error;
pub(crate) mod export;
pub(crate) mod import;
pub(crate) mod projects;
pub(crate) mod time_entries;
pub(crate) mod timer;

pub(crate) use error::ApiError;
