use std::slice;

use serde::Serialize;
use time::OffsetDateTime;

use crate::{NestService, Result};
use nest_domain::{Album, Observation, Resource, reconcile, resource_id};
use nest_storage::WriteGuard;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Persisted {
	pub resource: Resource,
	/// False when the stored document already matched and no write was issued.
	pub changed: bool,
	pub new_albums: Vec<Album>,
}

impl NestService {
	/// Merges `observation` into the stored document and writes it when a tracked field changed.
	///
	/// Writes are guarded by the version read before reconciling. A conflicting write is
	/// re-read and re-reconciled up to `ingest.max_conflict_retries` times.
	pub async fn reconcile_and_persist(&self, observation: Observation) -> Result<Persisted> {
		let mut observation = observation;

		if self.cfg.ingest.parse_hashtags {
			observation.resource.absorb_hashtags();
		}

		let id = resource_id(&observation.resource.provider, observation.resource.external_id);
		let mut retries = 0;

		loop {
			let existing = self.index.get_by_ids(slice::from_ref(&id)).await?.into_iter().next();
			let reconciled =
				reconcile(observation.clone(), existing.as_ref(), OffsetDateTime::now_utc());

			if !reconciled.changed {
				tracing::debug!(id = %id, "Resource unchanged; write skipped.");

				return Ok(Persisted {
					resource: reconciled.resource,
					changed: false,
					new_albums: reconciled.new_albums,
				});
			}

			let guard = match &existing {
				Some(stored) => WriteGuard::Version(stored.version),
				None => WriteGuard::Absent,
			};

			match self.index.upsert(&reconciled.resource, guard).await {
				Ok(version) => {
					let mut resource = reconciled.resource;

					resource.version = version;

					if self.cfg.ingest.refresh_after_write {
						self.index.refresh(self.index.name()).await?;
					}

					tracing::info!(
						id = %id,
						provider = %resource.provider,
						external_id = resource.external_id,
						version,
						removed = resource.removed,
						"Resource persisted."
					);

					return Ok(Persisted {
						resource,
						changed: true,
						new_albums: reconciled.new_albums,
					});
				},
				Err(nest_storage::Error::Conflict(message))
					if retries < self.cfg.ingest.max_conflict_retries =>
				{
					retries += 1;

					tracing::warn!(
						id = %id,
						retries,
						reason = %message,
						"Write conflict; reconciling again."
					);
				},
				Err(err) => return Err(err.into()),
			}
		}
	}
}
