//! Conference registration bot: a guided Telegram conversation that collects
//! a registration, stores it, and mirrors it to a spreadsheet.

pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod mirror;
pub mod registration;
pub mod routes;
pub mod store;
