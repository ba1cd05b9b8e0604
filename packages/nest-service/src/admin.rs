use serde::{Deserialize, Serialize};

use crate::{Error, NestService, Result};
use nest_domain::{Field, FilterTree, FilterValue, SortDirection, SortField, SortKey};
use nest_storage::{SearchIndex, SearchQuery, WriteGuard};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexReport {
	pub scanned: u64,
	pub written: u64,
	/// Documents whose legacy single album was moved into `albums`.
	pub migrated_albums: u64,
}

impl NestService {
	/// Copies every document of `source` into `target`, migrating legacy albums on the way.
	///
	/// `batch` defaults to `index.scroll_batch`. Tombstoned documents are copied as well.
	pub async fn reindex(
		&self,
		source: &dyn SearchIndex,
		target: &dyn SearchIndex,
		batch: Option<u32>,
	) -> Result<ReindexReport> {
		if source.name() == target.name() {
			return Err(Error::InvalidArgument {
				message: format!("Cannot reindex {} into itself.", source.name()),
			});
		}

		let batch = batch.unwrap_or(self.cfg.index.scroll_batch);

		if batch == 0 {
			return Err(Error::InvalidArgument {
				message: "batch must be greater than zero.".to_string(),
			});
		}

		let mut report = ReindexReport::default();
		let mut last: Option<u64> = None;

		loop {
			let query = SearchQuery {
				filter: scan_filter(last),
				sort: vec![SortKey { field: SortField::ExternalId, direction: SortDirection::Asc }],
				from: 0,
				size: batch,
			};
			let hits = source.execute(&query).await?;
			let fetched = hits.documents.len();

			last = hits.documents.last().map(|document| document.external_id).or(last);

			for mut document in hits.documents {
				report.scanned += 1;

				if document.absorb_legacy_album() {
					report.migrated_albums += 1;
				}

				target.upsert(&document, WriteGuard::Any).await?;

				report.written += 1;
			}

			tracing::info!(
				source = source.name(),
				target = target.name(),
				scanned = report.scanned,
				remaining = hits.total.saturating_sub(fetched as u64),
				"Reindex batch copied."
			);

			if fetched < batch as usize {
				break;
			}
		}

		target.refresh(target.name()).await?;

		tracing::info!(
			source = source.name(),
			target = target.name(),
			written = report.written,
			migrated_albums = report.migrated_albums,
			"Reindex finished."
		);

		Ok(report)
	}
}

/// Documents after the last copied `external_id`; the scan never revisits a window.
fn scan_filter(last: Option<u64>) -> FilterTree {
	match last {
		Some(last) => FilterTree::range(
			Field::ExternalId,
			Some(FilterValue::Integer(last)),
			None,
			false,
			true,
		),
		None => FilterTree::match_all(),
	}
}
