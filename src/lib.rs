#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;

pub use config::Config;

/// Build the rocket instance: all fairings attached, all routes mounted.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .attach(config::DatabaseFairing)
        .attach(events::BroadcastFairing)
        .attach(logging::LoggerFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}
