use clap::Parser;
use panosphere_native::{app, cli::Cli};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    app::run(&cli)
}
