use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use aquakit_core::model::TestType;
use aquakit_core::providers::gemini::DEFAULT_MODEL;

/// Default reading log file, shared by all subcommands.
pub const DEFAULT_LOG: &str = "test_predictions.csv";

#[derive(Parser)]
#[command(
    name = "aquakit",
    version,
    about = "Analyze aquarium water test kit photos with a multimodal inference service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze one or more test kit images and record the readings
    Analyze(AnalyzeArgs),
    /// Show recorded readings
    History(HistoryArgs),
    /// Write one test type's readings to a CSV file
    Export(ExportArgs),
}

/// Test kind as accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestKind {
    Ammonia,
    Nitrite,
    Ph,
}

impl From<TestKind> for TestType {
    fn from(kind: TestKind) -> Self {
        match kind {
            TestKind::Ammonia => TestType::Ammonia,
            TestKind::Nitrite => TestType::Nitrite,
            TestKind::Ph => TestType::Ph,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Provider {
    Gemini,
    Fake,
}

#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Test kind the images belong to
    #[arg(value_enum)]
    pub test_type: TestKind,

    /// Image files (jpg, jpeg or png)
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Measurement unit for ammonia/nitrite readings
    #[arg(long, default_value = "mg/L")]
    pub unit: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Inference model to query
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Inference provider ("fake" answers offline with a canned response)
    #[arg(long, value_enum, default_value = "gemini")]
    pub provider: Provider,

    /// Canned response text for the fake provider
    #[arg(long)]
    pub fake_response: Option<String>,

    /// Reading log file
    #[arg(long, default_value = DEFAULT_LOG)]
    pub log: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct HistoryArgs {
    /// Test kind to show (all three when omitted)
    #[arg(value_enum)]
    pub test_type: Option<TestKind>,

    /// Reading log file
    #[arg(long, default_value = DEFAULT_LOG)]
    pub log: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Test kind to export
    #[arg(value_enum)]
    pub test_type: TestKind,

    /// Output CSV path
    #[arg(long)]
    pub out: PathBuf,

    /// Reading log file
    #[arg(long, default_value = DEFAULT_LOG)]
    pub log: PathBuf,
}
