use clap::{Args, ArgAction};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Args)]
#[clap(next_help_heading = "Global Options")]
pub struct GlobalOpts {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Explicit tracing filter, e.g. "ppu=trace,memory=debug". Overrides -v
    #[arg(long = "log", global = true, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl GlobalOpts {
    pub fn filter(&self) -> String {
        if let Some(filter) = &self.log_filter {
            return filter.clone();
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }.to_owned()
    }

    /// Installs the global tracing subscriber.
    /// Falls back to RUST_LOG when neither -v nor --log was given.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        let filter = if self.log_filter.is_none() && self.verbose == 0 {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.filter()))
        } else {
            EnvFilter::try_new(self.filter())?
        };

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[clap(flatten)]
        global: GlobalOpts,
    }

    #[test]
    fn verbosity_maps_to_filter() {
        let cli = TestCli::parse_from(["test", "-vv"]);
        assert_eq!(cli.global.filter(), "trace");
        let cli = TestCli::parse_from(["test"]);
        assert_eq!(cli.global.filter(), "info");
    }

    #[test]
    fn explicit_filter_wins() {
        let cli = TestCli::parse_from(["test", "-v", "--log", "ppu=trace"]);
        assert_eq!(cli.global.filter(), "ppu=trace");
    }
}
