use std::{path::PathBuf, sync::Arc};

use clap::{
	Parser,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use color_eyre::eyre;
use tracing_subscriber::EnvFilter;

use nest_config::{BACKEND_QDRANT, Config};
use nest_service::NestService;
use nest_storage::{IndexSchema, QdrantIndex};

/// Copies one resources collection into another, migrating legacy single albums.
#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Collection to read from.
	#[arg(long, value_name = "NAME")]
	pub from: String,
	/// Collection to write into; created with the resources schema when missing.
	#[arg(long, value_name = "NAME")]
	pub to: String,
	/// Documents per page; defaults to `index.scroll_batch`.
	#[arg(long, value_name = "N")]
	pub batch: Option<u32>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nest_config::load(&args.config)?;
	let filter = EnvFilter::try_new(&config.service.log_level)
		.unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if config.index.backend != BACKEND_QDRANT {
		eyre::bail!("nest-migrate requires index.backend = \"qdrant\".");
	}

	let source = collection(&config, &args.from)?;
	let target = Arc::new(collection(&config, &args.to)?);

	target.ensure_collection().await?;

	let service = NestService::new(config, target.clone());
	let report = service.reindex(&source, target.as_ref(), args.batch).await?;

	tracing::info!(
		from = %args.from,
		to = %args.to,
		scanned = report.scanned,
		written = report.written,
		migrated_albums = report.migrated_albums,
		"Migration complete."
	);

	Ok(())
}

fn collection(config: &Config, name: &str) -> color_eyre::Result<QdrantIndex> {
	let index = nest_config::Index { name: name.to_string(), ..config.index.clone() };

	Ok(QdrantIndex::new(&index, IndexSchema::resources())?)
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.literal(AnsiColor::Green.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Yellow.on_default())
}
