mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Fetch, Index, Ingest, Service};

use std::{fs, path::Path};

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_QDRANT: &str = "qdrant";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.index.name.trim().is_empty() {
		return Err(Error::Validation { message: "index.name must be non-empty.".to_string() });
	}
	if !matches!(cfg.index.backend.as_str(), BACKEND_MEMORY | BACKEND_QDRANT) {
		return Err(Error::Validation {
			message: "index.backend must be one of memory or qdrant.".to_string(),
		});
	}
	if cfg.index.backend == BACKEND_QDRANT && cfg.index.url.is_none() {
		return Err(Error::Validation {
			message: "index.url is required when index.backend is qdrant.".to_string(),
		});
	}
	if cfg.index.scroll_batch == 0 {
		return Err(Error::Validation {
			message: "index.scroll_batch must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("fetch.default_page_size", cfg.fetch.default_page_size),
		("fetch.max_page_size", cfg.fetch.max_page_size),
		("fetch.people_facet_size", cfg.fetch.people_facet_size),
		("fetch.tag_facet_size", cfg.fetch.tag_facet_size),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	if cfg.fetch.default_page_size > cfg.fetch.max_page_size {
		return Err(Error::Validation {
			message: "fetch.default_page_size must not exceed fetch.max_page_size.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.index.backend = cfg.index.backend.trim().to_ascii_lowercase();

	if cfg.index.url.as_deref().map(|url| url.trim().is_empty()).unwrap_or(false) {
		cfg.index.url = None;
	}
}
