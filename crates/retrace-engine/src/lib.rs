pub mod align;
pub mod builder;
pub mod classify;
pub mod coalesce;
pub mod config;
pub mod processor;
pub mod projection;
pub mod retry;
pub mod store;
pub mod stores;

pub use retrace_common::action;
pub use retrace_common::protocol;
pub use retrace_common::record;
