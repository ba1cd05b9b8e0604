use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		RwLock, RwLockReadGuard, RwLockWriteGuard,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
};

use nest_domain::{FilterTree, Resource};

use crate::{
	BoxFuture, Error, Hits, Result, SearchIndex, SearchQuery, TermBucket, TermsAggregation,
	WriteGuard, index, sort,
};

/// In-process index with the same query semantics as the Qdrant adapter.
///
/// Writes are visible immediately. Guards are checked and applied under one lock, so
/// versioned writes are atomic.
pub struct MemoryIndex {
	name: String,
	documents: RwLock<BTreeMap<String, Resource>>,
	unavailable: AtomicBool,
	queries: AtomicU64,
	writes: AtomicU64,
	refreshes: AtomicU64,
}
impl MemoryIndex {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			documents: RwLock::new(BTreeMap::new()),
			unavailable: AtomicBool::new(false),
			queries: AtomicU64::new(0),
			writes: AtomicU64::new(0),
			refreshes: AtomicU64::new(0),
		}
	}

	/// Inserts documents as-is, bypassing guards and counters.
	pub fn seed<I>(&self, documents: I)
	where
		I: IntoIterator<Item = Resource>,
	{
		let mut stored = self.write_documents();

		for document in documents {
			stored.insert(document.id.clone(), document);
		}
	}

	/// Makes every subsequent call fail with [`Error::Unavailable`] until reset.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::SeqCst);
	}

	/// Number of execute, count and aggregate calls served.
	pub fn query_count(&self) -> u64 {
		self.queries.load(Ordering::SeqCst)
	}

	pub fn write_count(&self) -> u64 {
		self.writes.load(Ordering::SeqCst)
	}

	pub fn refresh_count(&self) -> u64 {
		self.refreshes.load(Ordering::SeqCst)
	}

	pub fn len(&self) -> usize {
		self.read_documents().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn ensure_available(&self) -> Result<()> {
		if self.unavailable.load(Ordering::SeqCst) {
			return Err(Error::Unavailable(format!("Index {} is unavailable.", self.name)));
		}

		Ok(())
	}

	fn ensure_own_name(&self, name: &str) -> Result<()> {
		if name != self.name {
			return Err(Error::NotFound(format!("Index {name} does not exist.")));
		}

		Ok(())
	}

	fn read_documents(&self) -> RwLockReadGuard<'_, BTreeMap<String, Resource>> {
		self.documents.read().unwrap_or_else(|err| err.into_inner())
	}

	fn write_documents(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Resource>> {
		self.documents.write().unwrap_or_else(|err| err.into_inner())
	}

	fn matching(&self, filter: &FilterTree) -> Result<Vec<Resource>> {
		self.ensure_available()?;
		self.queries.fetch_add(1, Ordering::SeqCst);

		Ok(self.read_documents().values().filter(|doc| filter.matches(*doc)).cloned().collect())
	}
}
impl SearchIndex for MemoryIndex {
	fn name(&self) -> &str {
		&self.name
	}

	fn execute<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Hits>> {
		Box::pin(async move {
			let mut documents = self.matching(&query.filter)?;
			let total = documents.len() as u64;

			sort::sort_documents(&mut documents, &query.sort);

			Ok(Hits { total, documents: sort::window(documents, query.from, query.size) })
		})
	}

	fn aggregate<'a>(
		&'a self,
		filter: &'a FilterTree,
		aggregation: TermsAggregation,
	) -> BoxFuture<'a, Result<Vec<TermBucket>>> {
		Box::pin(async move {
			let documents = self.matching(filter)?;
			let mut counts: HashMap<String, u64> = HashMap::new();

			for document in &documents {
				for value in aggregation.field.values(document) {
					*counts.entry(value.to_string()).or_default() += 1;
				}
			}

			let buckets =
				counts.into_iter().map(|(key, count)| TermBucket { key, count }).collect();

			Ok(index::rank_buckets(buckets, aggregation.size))
		})
	}

	fn count<'a>(&'a self, filter: &'a FilterTree) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { Ok(self.matching(filter)?.len() as u64) })
	}

	fn get_by_ids<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<Resource>>> {
		Box::pin(async move {
			self.ensure_available()?;

			let stored = self.read_documents();

			Ok(ids.iter().filter_map(|id| stored.get(id).cloned()).collect())
		})
	}

	fn upsert<'a>(
		&'a self,
		document: &'a Resource,
		guard: WriteGuard,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			self.ensure_available()?;

			let mut stored = self.write_documents();
			let current = stored.get(&document.id).map(|existing| existing.version);

			guard.check(&document.id, current)?;

			let version = current.map_or(1, |version| version + 1);
			let mut document = document.clone();

			document.version = version;

			stored.insert(document.id.clone(), document);
			self.writes.fetch_add(1, Ordering::SeqCst);

			Ok(version)
		})
	}

	fn delete_index<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.ensure_available()?;
			self.ensure_own_name(name)?;
			self.write_documents().clear();

			Ok(())
		})
	}

	fn refresh<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.ensure_available()?;
			self.ensure_own_name(name)?;
			self.refreshes.fetch_add(1, Ordering::SeqCst);

			Ok(())
		})
	}
}
