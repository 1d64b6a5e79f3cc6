use anyhow::Result;
use cli::CliApp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let invocation = CliApp::parse(std::env::args().collect());
    let default_filter = if invocation.verbose() {
        "soliditystudio=debug,cli=debug,resolver=debug,compiler=debug,project=debug"
    } else {
        "soliditystudio=info,cli=info,resolver=warn,compiler=info,project=warn"
    };

    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    CliApp::run_invocation(invocation)
}
