#[macro_use] extern crate bitflags;
#[macro_use] extern crate log;
#[macro_use] extern crate serde_derive;

#[macro_use] mod macros;

pub mod actions;
pub mod admin;
pub mod audit;
pub mod config;
pub mod models;
pub mod permissions;
pub mod schema;
pub mod store;
pub mod utils;

pub type Result<T, E = failure::Error> = std::result::Result<T, E>;
