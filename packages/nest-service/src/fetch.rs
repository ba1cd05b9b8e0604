use serde::Serialize;

use crate::{Error, NestService, Result};
use nest_domain::{
	Field, FetchOptions, FilterTree, PageCursor, Resource, Sources, build_query_filter, sort_keys,
};
use nest_storage::SearchQuery;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// Matches across all pages.
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	/// Position of the last item; feed it to [`FetchOptions::after`] for the next page.
	pub next_cursor: Option<PageCursor>,
}
impl<T> Page<T> {
	pub fn empty(page: u32, page_size: u32) -> Self {
		Self { items: Vec::new(), total: 0, page, page_size, next_cursor: None }
	}
}

impl NestService {
	/// One page of the nest described by `sources`. An empty `sources` map yields an empty page.
	pub async fn fetch(&self, sources: &Sources, opts: &FetchOptions) -> Result<Page<Resource>> {
		let window = opts.window(self.cfg.fetch.default_page_size, self.cfg.fetch.max_page_size)?;
		let Some(filter) = self.nest_filter(sources, opts)? else {
			return Ok(Page::empty(opts.page, window.size));
		};
		let query =
			SearchQuery { filter, sort: sort_keys(opts), from: window.from, size: window.size };
		let hits = self.index.execute(&query).await?;
		let next_cursor = hits.documents.last().map(PageCursor::of);

		Ok(Page {
			items: hits.documents,
			total: hits.total,
			page: opts.page,
			page_size: window.size,
			next_cursor,
		})
	}

	/// Total matches for the nest, ignoring the paging fields of `opts`.
	pub async fn count(&self, sources: &Sources, opts: &FetchOptions) -> Result<u64> {
		let Some(filter) = self.nest_filter(sources, opts)? else {
			return Ok(0);
		};

		Ok(self.index.count(&filter).await?)
	}

	/// Documents with the given ids, optionally restricted to `owner_uids`.
	pub async fn fetch_ids(
		&self,
		ids: &[String],
		owner_uids: Option<&[String]>,
	) -> Result<Vec<Resource>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let mut conjuncts = vec![FilterTree::terms(Field::Id, ids.iter())];

		if let Some(owner_uids) = owner_uids {
			if owner_uids.is_empty() {
				return Err(Error::InvalidArgument {
					message: "owner filter must list at least one owner_uid.".to_string(),
				});
			}

			conjuncts.push(FilterTree::terms(Field::OwnerUid, owner_uids.iter()));
		}

		let query = SearchQuery {
			filter: FilterTree::And(conjuncts),
			sort: sort_keys(&FetchOptions::default()),
			from: 0,
			size: u32::try_from(ids.len()).unwrap_or(u32::MAX),
		};

		Ok(self.index.execute(&query).await?.documents)
	}

	/// Whether the visible document `id` belongs to the nest.
	pub async fn includes(&self, sources: &Sources, id: &str) -> Result<bool> {
		let opts = FetchOptions { id: Some(id.to_string()), ..Default::default() };

		Ok(self.count(sources, &opts).await? > 0)
	}

	pub(crate) fn nest_filter(
		&self,
		sources: &Sources,
		opts: &FetchOptions,
	) -> Result<Option<FilterTree>> {
		let filter = build_query_filter(sources, opts)?;

		if let Some(filter) = &filter {
			tracing::debug!(filter = %filter.to_value(), "Nest filter built.");
		}

		Ok(filter)
	}
}
