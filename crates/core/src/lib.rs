//! Driver-free core of the `leaf` document browser.

pub mod audit_trail;
pub mod browser;
pub mod catalog;
pub mod coercion;
pub mod config;
pub mod connection_manager;
pub mod data_source;
pub mod detail;
pub mod document;
pub mod mutation;
pub mod pagination;
pub mod profiles;
pub mod query;
pub mod sequencer;
pub mod table_view;
