use clap::Parser;

use nest_migrate::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	nest_migrate::run(Args::parse()).await
}
