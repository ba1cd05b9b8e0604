mod error;

pub use error::{Error, Result};

use std::{env, sync::Arc, time::Duration};

use qdrant_client::Qdrant;
use time::{OffsetDateTime, macros::datetime};
use tokio::time as tokio_time;
use uuid::Uuid;

use nest_config::{BACKEND_MEMORY, Config, Fetch, Index, Ingest, Service};
use nest_domain::{Album, Person, Resource};
use nest_storage::{IndexSchema, MemoryIndex, QdrantIndex};

pub const INDEX_NAME: &str = "resources";

pub const FACEBOOK_OWNER: &str = "100001";
pub const FACEBOOK_OTHER_OWNER: &str = "100002";
pub const INSTAGRAM_OWNER: &str = "200001";
pub const INSTAGRAM_OTHER_OWNER: &str = "200002";
pub const PAGING_OWNER: &str = "300001";
pub const PAGING_TAG: &str = "sunset";

/// Config for a memory-backed service with default fetch and ingest settings.
pub fn test_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		index: Index {
			backend: BACKEND_MEMORY.to_string(),
			name: INDEX_NAME.to_string(),
			url: None,
			scroll_batch: 256,
		},
		fetch: Fetch::default(),
		ingest: Ingest::default(),
	}
}

/// Four Facebook photos across albums "1" and "2" plus four Instagram photos tagged
/// `california` or `norcal`.
pub fn resources() -> Vec<Resource> {
	vec![
		facebook(1, "1", FACEBOOK_OWNER, &["22", "34"], datetime!(2013-01-01 00:02:14 UTC)),
		facebook(2, "1", FACEBOOK_OWNER, &["22", "42"], datetime!(2013-01-18 15:26:42 UTC)),
		facebook(3, "2", FACEBOOK_OTHER_OWNER, &["22", "43"], datetime!(2013-01-10 22:34:07 UTC)),
		facebook(4, "2", FACEBOOK_OWNER, &["42"], datetime!(2013-02-02 12:54:15 UTC)),
		instagram(101, INSTAGRAM_OWNER, "california", datetime!(2013-01-02 13:04:11 UTC)),
		instagram(102, INSTAGRAM_OTHER_OWNER, "california", datetime!(2012-12-05 09:23:56 UTC)),
		instagram(103, INSTAGRAM_OTHER_OWNER, "california", datetime!(2012-11-15 16:12:41 UTC)),
		instagram(104, INSTAGRAM_OTHER_OWNER, "norcal", datetime!(2012-11-15 11:55:24 UTC)),
	]
}

/// Seven photos of one owner with repeated upload times, for cursor paging.
pub fn ordered_resources() -> Vec<Resource> {
	let times = [
		datetime!(2014-03-01 10:00:00 UTC),
		datetime!(2014-03-01 10:00:00 UTC),
		datetime!(2014-03-01 10:00:00 UTC),
		datetime!(2014-02-20 08:30:00 UTC),
		datetime!(2014-02-20 08:30:00 UTC),
		datetime!(2014-02-01 00:00:00 UTC),
		datetime!(2014-01-15 12:00:00 UTC),
	];

	times
		.into_iter()
		.zip(201..)
		.map(|(uploaded_at, external_id)| {
			instagram(external_id, PAGING_OWNER, PAGING_TAG, uploaded_at)
		})
		.collect()
}

pub fn seeded_index(documents: Vec<Resource>) -> Arc<MemoryIndex> {
	let index = MemoryIndex::new(INDEX_NAME);

	index.seed(documents);

	Arc::new(index)
}

pub fn find(documents: &[Resource], provider: &str, external_id: u64) -> Resource {
	documents
		.iter()
		.find(|doc| doc.provider == provider && doc.external_id == external_id)
		.cloned()
		.unwrap_or_else(|| panic!("No fixture {provider}:{external_id}."))
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("NEST_QDRANT_URL").ok()
}

/// A uniquely named Qdrant collection that is deleted by [`TestCollection::cleanup`].
pub struct TestCollection {
	pub index: Arc<QdrantIndex>,
}
impl TestCollection {
	pub async fn new(qdrant_url: &str, prefix: &str) -> Result<Self> {
		let client = Qdrant::from_url(qdrant_url)
			.build()
			.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
		let name = format!("{prefix}_{}", Uuid::new_v4().simple());
		let index = QdrantIndex::with_client(client, name, IndexSchema::resources(), 4);

		index.ensure_collection().await?;

		Ok(Self { index: Arc::new(index) })
	}

	pub fn name(&self) -> &str {
		&self.index.collection
	}

	pub async fn cleanup(self) -> Result<()> {
		let max_attempts = 4;
		let mut backoff = Duration::from_millis(100);

		for attempt in 1..=max_attempts {
			let result = tokio_time::timeout(
				Duration::from_secs(10),
				self.index.client.delete_collection(self.index.collection.clone()),
			)
			.await;

			match result {
				Ok(Ok(_)) => return Ok(()),
				Ok(Err(err)) =>
					if attempt == max_attempts {
						return Err(err.into());
					},
				Err(_) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Timed out deleting Qdrant collection {:?}.",
							self.index.collection
						)));
					},
			}

			tokio_time::sleep(backoff).await;

			backoff = backoff.saturating_mul(2);
		}

		Ok(())
	}
}

fn facebook(
	external_id: u64,
	album: &str,
	owner_uid: &str,
	people: &[&str],
	uploaded_at: OffsetDateTime,
) -> Resource {
	Resource {
		owner_nickname: Some(nickname(owner_uid, FACEBOOK_OWNER)),
		title: Some(format!("Facebook photo {external_id}")),
		url: Some(format!("https://example.com/facebook/{external_id}.jpg")),
		kind: Some("photo".to_string()),
		albums: vec![Album::new(album, format!("Album {album}"))],
		people: people.iter().map(|id| Person::new(*id, format!("Person {id}"))).collect(),
		created_at: Some(uploaded_at),
		uploaded_at: Some(uploaded_at),
		..Resource::new("facebook", external_id, owner_uid)
	}
}

fn instagram(
	external_id: u64,
	owner_uid: &str,
	tag: &str,
	uploaded_at: OffsetDateTime,
) -> Resource {
	Resource {
		owner_nickname: Some(nickname(owner_uid, INSTAGRAM_OWNER)),
		title: Some(format!("Instagram photo {external_id}")),
		url: Some(format!("https://example.com/instagram/{external_id}.jpg")),
		kind: Some("photo".to_string()),
		tags: [tag.to_string()].into_iter().collect(),
		created_at: Some(uploaded_at),
		uploaded_at: Some(uploaded_at),
		..Resource::new("instagram", external_id, owner_uid)
	}
}

fn nickname(owner_uid: &str, first_owner: &str) -> String {
	let nickname = if owner_uid == first_owner { "alice" } else { "bob" };

	nickname.to_string()
}
