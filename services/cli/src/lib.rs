mod cli;
mod demo;
mod infra;
mod score;
mod train;

use titleguard_risk::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
