use clap::{Args, Parser, Subcommand, ValueEnum};
use common::request::AccuracyLevel;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use a simulated receiver driving along the route of `--gps-source-file`.
    #[arg(short, long)]
    pub gps_fake: bool,
    /// CSV file with a header row and `longitude,latitude` records of the simulated route.
    #[arg(short = 'f', long)]
    pub gps_source_file: Option<String>,
    /// Velocity of the simulated receiver in meters per second.
    #[arg(long, default_value_t = 10.0)]
    pub velocity: f64,
    /// Use the GPSD daemon.
    #[arg(short = 'd', long)]
    pub gpsd: bool,
    #[arg(long, default_value = "127.0.0.1:2947")]
    pub gpsd_address: String,
    /// Seconds a one-shot position request waits for a fix.
    #[arg(short, long)]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the selectable accuracy levels.
    Accuracies,
    /// Request location access and print the resulting state.
    Access(ListenArgs),
    /// Start a listener and print every reading until Ctrl-C.
    Listen {
        #[command(flatten)]
        args: ListenArgs,
        /// Stop after this many readings.
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Wait for a single position fix.
    Current,
    /// Print the most recent reading without accessing the receiver.
    Last,
    /// Print the most recent reading while it is fresh, otherwise wait for a fix.
    LastOrCurrent,
    /// Set the title of the background notification.
    Title { title: String },
    /// Set the message of the background notification.
    Message { message: String },
}

/// The listener selection of the front-end, without `--accuracy` the stored accuracy is used.
#[derive(Args, Debug, Default)]
pub struct ListenArgs {
    #[arg(short, long, value_enum)]
    pub accuracy: Option<Accuracy>,
    /// Keep receiving updates in the background.
    #[arg(short, long)]
    pub background: bool,
    /// Deliver background updates without batching, only used with `--background`.
    #[arg(short, long)]
    pub realtime: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Accuracy {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
}

impl From<Accuracy> for AccuracyLevel {
    fn from(accuracy: Accuracy) -> Self {
        match accuracy {
            Accuracy::Lowest => AccuracyLevel::Lowest,
            Accuracy::Low => AccuracyLevel::Low,
            Accuracy::Normal => AccuracyLevel::Normal,
            Accuracy::High => AccuracyLevel::High,
            Accuracy::Highest => AccuracyLevel::Highest,
        }
    }
}
