#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod db;
pub mod enrollment;
pub mod env;
pub mod error;
pub mod identity;
pub mod models;
pub mod progress;
pub mod telemetry;
pub mod validation;
pub mod wishlist;
#[cfg(test)]
mod test;

use std::sync::Mutex;

use api::{
    api_enroll, api_enrolled_students, api_mark_lesson_complete, api_me, api_register,
    api_save_scratchpad, api_teacher_stats, api_toggle_wishlist, health,
};
use auth::{forbidden_api, unauthorized_api};
use error::AppError;
use once_cell::sync::Lazy;
use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use telemetry::{OtelGuard, TelemetryFairing};
use thiserror::Error;
use tracing::info;

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting EduStream enrollment service");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                api_register,
                api_me,
                api_save_scratchpad,
                api_enroll,
                api_toggle_wishlist,
                api_mark_lesson_complete,
                api_enrolled_students,
                api_teacher_stats,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
}
