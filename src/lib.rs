pub mod app;
pub mod assess;
pub mod catalog;
pub mod domain;
pub mod error;
pub mod layout;
pub mod output;
pub mod prune;
pub mod remote;
pub mod rename;
pub mod sync;
pub mod unpack;
