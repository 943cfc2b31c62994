pub mod action;
pub mod error;
pub mod protocol;
pub mod record;
