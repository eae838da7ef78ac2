pub mod error;
pub mod fetcher;
pub mod history;
pub mod record;
pub mod refresher;
pub mod registration;
pub mod store;
pub mod summary;
pub mod sync;
