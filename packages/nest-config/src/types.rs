use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	#[serde(default)]
	pub fetch: Fetch,
	#[serde(default)]
	pub ingest: Ingest,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Index {
	/// One of "memory" or "qdrant".
	pub backend: String,
	/// Collection (index) name the resources live in.
	pub name: String,
	/// Required when `backend` is "qdrant".
	pub url: Option<String>,
	#[serde(default = "default_scroll_batch")]
	pub scroll_batch: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Fetch {
	pub default_page_size: u32,
	pub max_page_size: u32,
	pub people_facet_size: u32,
	pub tag_facet_size: u32,
}
impl Default for Fetch {
	fn default() -> Self {
		Self {
			default_page_size: 10,
			max_page_size: 100,
			people_facet_size: 50,
			tag_facet_size: 50,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Ingest {
	#[serde(default)]
	pub parse_hashtags: bool,
	#[serde(default = "default_refresh_after_write")]
	pub refresh_after_write: bool,
	/// Extra attempts after a version conflict before the conflict is surfaced.
	#[serde(default = "default_max_conflict_retries")]
	pub max_conflict_retries: u32,
}
impl Default for Ingest {
	fn default() -> Self {
		Self {
			parse_hashtags: false,
			refresh_after_write: default_refresh_after_write(),
			max_conflict_retries: default_max_conflict_retries(),
		}
	}
}

fn default_scroll_batch() -> u32 {
	256
}

fn default_refresh_after_write() -> bool {
	true
}

fn default_max_conflict_retries() -> u32 {
	3
}
