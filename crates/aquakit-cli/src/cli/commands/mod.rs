pub mod analyze;
pub mod export;
pub mod history;

use crate::cli::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Analyze(args) => analyze::run(args).await,
        Command::History(args) => history::run(args),
        Command::Export(args) => export::run(args),
    }
}
