mod app;
mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Platform: {}", std::env::consts::OS);
    println!("Architecture: {}", std::env::consts::ARCH);

    let app = App::new(Cli::parse())?;
    app.run()?;

    Ok(())
}
