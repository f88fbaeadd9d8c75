pub mod config;
pub mod error;
pub mod listings;
pub mod telemetry;

mod cli;
mod demo;
mod infra;
mod server;

use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
