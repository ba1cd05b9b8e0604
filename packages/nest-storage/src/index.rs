use std::{future::Future, pin::Pin};

use nest_domain::{FilterTree, Resource, SortKey};

use crate::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
	pub filter: FilterTree,
	pub sort: Vec<SortKey>,
	pub from: u64,
	pub size: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hits {
	/// Matches for the filter, ignoring the paging window.
	pub total: u64,
	pub documents: Vec<Resource>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregationField {
	PeopleId,
	Tags,
}
impl AggregationField {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PeopleId => "people.id",
			Self::Tags => "tags",
		}
	}

	/// Distinct values of the field on one document.
	pub fn values<'a>(&self, resource: &'a Resource) -> Vec<&'a str> {
		let mut values: Vec<&str> = match self {
			Self::PeopleId => resource.people.iter().map(|person| person.id.as_str()).collect(),
			Self::Tags => resource.tags.iter().map(String::as_str).collect(),
		};

		values.sort_unstable();
		values.dedup();

		values
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermsAggregation {
	pub field: AggregationField,
	/// Maximum number of buckets returned.
	pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermBucket {
	pub key: String,
	pub count: u64,
}

/// Precondition checked against the stored document before a write is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteGuard {
	Any,
	/// The document must not exist yet.
	Absent,
	/// The stored document must carry exactly this version.
	Version(u64),
}
impl WriteGuard {
	pub fn check(&self, id: &str, stored: Option<u64>) -> Result<()> {
		let accepted = match (self, stored) {
			(Self::Any, _) | (Self::Absent, None) => true,
			(Self::Version(expected), Some(actual)) => *expected == actual,
			_ => false,
		};

		if accepted {
			return Ok(());
		}

		Err(crate::Error::Conflict(format!(
			"Document {id} failed write guard {self:?} (stored version {stored:?})."
		)))
	}
}

/// A document search index bound to one named collection.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn name(&self) -> &str;

	fn execute<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Hits>>;

	/// Term buckets ordered by descending count, then ascending key.
	fn aggregate<'a>(
		&'a self,
		filter: &'a FilterTree,
		aggregation: TermsAggregation,
	) -> BoxFuture<'a, Result<Vec<TermBucket>>>;

	fn count<'a>(&'a self, filter: &'a FilterTree) -> BoxFuture<'a, Result<u64>>;

	/// Real-time lookup by id in request order; unknown ids are skipped.
	fn get_by_ids<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<Resource>>>;

	/// Writes `document` under its `id` and returns the stored version.
	fn upsert<'a>(
		&'a self,
		document: &'a Resource,
		guard: WriteGuard,
	) -> BoxFuture<'a, Result<u64>>;

	fn delete_index<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;

	fn refresh<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>>;
}

/// Orders term counts the way every index reports them.
pub fn rank_buckets(mut buckets: Vec<TermBucket>, size: u32) -> Vec<TermBucket> {
	buckets.sort_by(|lhs, rhs| rhs.count.cmp(&lhs.count).then_with(|| lhs.key.cmp(&rhs.key)));
	buckets.truncate(size as usize);

	buckets
}

#[cfg(test)]
mod tests {
	use crate::{
		Error,
		index::{TermBucket, WriteGuard, rank_buckets},
	};

	fn bucket(key: &str, count: u64) -> TermBucket {
		TermBucket { key: key.to_string(), count }
	}

	#[test]
	fn guards_accept_matching_state_only() {
		assert!(WriteGuard::Any.check("a", Some(3)).is_ok());
		assert!(WriteGuard::Absent.check("a", None).is_ok());
		assert!(WriteGuard::Version(3).check("a", Some(3)).is_ok());
		assert!(matches!(WriteGuard::Absent.check("a", Some(1)), Err(Error::Conflict(_))));
		assert!(matches!(WriteGuard::Version(2).check("a", Some(3)), Err(Error::Conflict(_))));
		assert!(matches!(WriteGuard::Version(2).check("a", None), Err(Error::Conflict(_))));
	}

	#[test]
	fn buckets_rank_by_count_then_key() {
		let ranked = rank_buckets(
			vec![bucket("43", 1), bucket("22", 3), bucket("34", 1), bucket("42", 2)],
			3,
		);

		assert_eq!(ranked, vec![bucket("22", 3), bucket("42", 2), bucket("34", 1)]);
	}
}
