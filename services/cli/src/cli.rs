use crate::demo::{run_demo, DemoArgs};
use crate::infra::{bootstrap, ConfigOverrides};
use crate::score::{run_score, ScoreArgs};
use crate::train::{run_train, TrainArgs};
use clap::{Parser, Subcommand};
use titleguard_risk::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "titleguard",
    about = "Score underwriting risk for property title and closing workflows",
    version
)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one property factor record (JSON) and print the risk result
    Score(ScoreArgs),
    /// Load or train the model bundle and print its summary
    Train(TrainArgs),
    /// Score reference scenarios and print a readable breakdown
    Demo(DemoArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = bootstrap(cli.overrides)?;

    match cli.command {
        Command::Score(args) => run_score(args, &config),
        Command::Train(args) => run_train(args, &config),
        Command::Demo(args) => run_demo(args, &config),
    }
}
