use crate::{Error, NestService, Result};
use nest_domain::{Field, FetchOptions, FilterTree, Sources};
use nest_storage::{AggregationField, TermBucket, TermsAggregation};

impl NestService {
	/// People tagged across the nest with the number of documents each appears in.
	pub async fn find_tagged_people(
		&self,
		sources: &Sources,
		opts: &FetchOptions,
	) -> Result<Vec<TermBucket>> {
		let Some(filter) = self.nest_filter(sources, opts)? else {
			return Ok(Vec::new());
		};
		let aggregation = TermsAggregation {
			field: AggregationField::PeopleId,
			size: self.cfg.fetch.people_facet_size,
		};

		self.facet(&filter, aggregation).await
	}

	/// Tags used by one owner on visible documents.
	pub async fn find_user_tags(&self, owner_uid: &str) -> Result<Vec<TermBucket>> {
		let owner_uid = owner_uid.trim();

		if owner_uid.is_empty() {
			return Err(Error::InvalidArgument {
				message: "owner_uid must be non-empty.".to_string(),
			});
		}

		let filter = FilterTree::And(vec![
			FilterTree::term(Field::OwnerUid, owner_uid),
			FilterTree::term(Field::Removed, false),
		]);
		let aggregation =
			TermsAggregation { field: AggregationField::Tags, size: self.cfg.fetch.tag_facet_size };

		self.facet(&filter, aggregation).await
	}

	async fn facet(
		&self,
		filter: &FilterTree,
		aggregation: TermsAggregation,
	) -> Result<Vec<TermBucket>> {
		let buckets = self.index.aggregate(filter, aggregation).await?;

		tracing::debug!(
			index = self.index.name(),
			field = aggregation.field.as_str(),
			buckets = buckets.len(),
			"Facet computed."
		);

		Ok(buckets)
	}
}
