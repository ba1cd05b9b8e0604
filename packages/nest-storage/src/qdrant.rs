use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollection,
		DatetimeRange, Direction, Distance, FacetCountsBuilder, FieldType, Filter,
		GetPointsBuilder, OrderBy, PointId, PointStruct, Range, RetrievedPoint,
		ScrollPointsBuilder, Timestamp, UpsertPointsBuilder, Value, VectorParamsBuilder,
		facet_value::Variant, value::Kind,
	},
};
use serde_json::{Map, Value as JsonValue};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	AggregationField, BoxFuture, Error, FieldKind, Hits, IndexSchema, Result, SearchIndex,
	SearchQuery, TermBucket, TermsAggregation, WriteGuard, index, sort,
};
use nest_domain::{Field, FilterTree, FilterValue, Resource, SortDirection, SortField, SortKey};

/// Points carry no vectors of interest; every point stores this one-dimensional placeholder.
const PLACEHOLDER_VECTOR: [f32; 1] = [0.0];

/// [`SearchIndex`] over one Qdrant collection, documents stored as point payloads.
///
/// Sorting is applied in process over the scrolled matches so that tie-breaks and missing
/// values order exactly as in [`crate::MemoryIndex`]. A sort on `external_id` alone is served
/// by the payload index and reads only up to the end of the requested window. Write guards
/// are read-then-write and therefore not atomic across concurrent writers.
pub struct QdrantIndex {
	pub client: Qdrant,
	pub collection: String,
	pub schema: IndexSchema,
	pub scroll_batch: u32,
}
impl QdrantIndex {
	pub fn new(cfg: &nest_config::Index, schema: IndexSchema) -> Result<Self> {
		let url = cfg.url.as_deref().ok_or_else(|| {
			Error::Unavailable("index.url is required for the qdrant backend.".to_string())
		})?;
		let client = Qdrant::from_url(url).build()?;

		Ok(Self::with_client(client, cfg.name.clone(), schema, cfg.scroll_batch))
	}

	pub fn with_client(
		client: Qdrant,
		collection: impl Into<String>,
		schema: IndexSchema,
		scroll_batch: u32,
	) -> Self {
		Self { client, collection: collection.into(), schema, scroll_batch: scroll_batch.max(1) }
	}

	/// Creates the collection and its payload indexes when the collection is missing.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone())
					.vectors_config(VectorParamsBuilder::new(1, Distance::Dot)),
			)
			.await?;

		for field in self.schema.indexed() {
			let Some(field_type) = field_type(field.kind) else {
				continue;
			};
			let request = CreateFieldIndexCollection {
				collection_name: self.collection.clone(),
				wait: Some(true),
				field_name: field.path.to_string(),
				field_type: Some(field_type as i32),
				field_index_params: None,
				ordering: None,
			};

			self.client.create_field_index(request).await?;
		}

		tracing::info!(collection = %self.collection, "Qdrant collection created.");

		Ok(())
	}

	async fn scroll_all(&self, filter: Filter) -> Result<Vec<Resource>> {
		let mut documents = Vec::new();
		let mut offset: Option<PointId> = None;

		loop {
			let mut request = ScrollPointsBuilder::new(self.collection.clone())
				.filter(filter.clone())
				.limit(self.scroll_batch)
				.with_payload(true)
				.with_vectors(false);

			if let Some(offset) = offset.take() {
				request = request.offset(offset);
			}

			let response = self.client.scroll(request).await?;

			for point in response.result {
				documents.push(point_to_resource(point)?);
			}

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		Ok(documents)
	}

	async fn ordered_by_external_id(
		&self,
		filter: Filter,
		direction: SortDirection,
		from: u64,
		size: u32,
	) -> Result<Hits> {
		let total = self.count_matches(filter.clone()).await?;
		let end = from.saturating_add(u64::from(size)).min(total);

		if from >= end {
			return Ok(Hits { total, documents: Vec::new() });
		}

		let limit = u32::try_from(end)
			.map_err(|_| Error::Backend(format!("Window end {end} exceeds one scroll.")))?;
		let direction = match direction {
			SortDirection::Asc => Direction::Asc,
			SortDirection::Desc => Direction::Desc,
		};
		let order_by = OrderBy {
			key: SortField::ExternalId.as_str().to_string(),
			direction: Some(direction as i32),
			start_from: None,
		};
		let response = self
			.client
			.scroll(
				ScrollPointsBuilder::new(self.collection.clone())
					.filter(filter)
					.limit(limit)
					.order_by(order_by)
					.with_payload(true)
					.with_vectors(false),
			)
			.await?;
		let documents = response
			.result
			.into_iter()
			.skip(usize::try_from(from).unwrap_or(usize::MAX))
			.map(point_to_resource)
			.collect::<Result<Vec<_>>>()?;

		Ok(Hits { total, documents })
	}

	async fn count_matches(&self, filter: Filter) -> Result<u64> {
		let response = self
			.client
			.count(CountPointsBuilder::new(self.collection.clone()).filter(filter).exact(true))
			.await?;

		Ok(response.result.map(|result| result.count).unwrap_or(0))
	}

	async fn stored_version(&self, id: &str) -> Result<Option<u64>> {
		if Uuid::parse_str(id).is_err() {
			return Ok(None);
		}

		let response = self
			.client
			.get_points(
				GetPointsBuilder::new(self.collection.clone(), vec![PointId::from(id.to_string())])
					.with_payload(true),
			)
			.await?;

		Ok(response.result.into_iter().next().map(|point| {
			match point.payload.get("version").and_then(|value| value.kind.as_ref()) {
				Some(Kind::IntegerValue(version)) => u64::try_from(*version).unwrap_or(0),
				_ => 0,
			}
		}))
	}
}
impl SearchIndex for QdrantIndex {
	fn name(&self) -> &str {
		&self.collection
	}

	fn execute<'a>(&'a self, query: &'a SearchQuery) -> BoxFuture<'a, Result<Hits>> {
		Box::pin(async move {
			let filter = to_filter(&query.filter)?;

			if let [SortKey { field: SortField::ExternalId, direction }] = query.sort.as_slice() {
				return self
					.ordered_by_external_id(filter, *direction, query.from, query.size)
					.await;
			}

			let mut documents = self.scroll_all(filter).await?;
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
			let response = self
				.client
				.facet(
					FacetCountsBuilder::new(
						self.collection.clone(),
						aggregation_key(aggregation.field),
					)
					.filter(to_filter(filter)?)
					.limit(u64::from(aggregation.size))
					.exact(true),
				)
				.await?;
			let buckets = response
				.hits
				.into_iter()
				.filter_map(|hit| {
					let key = match hit.value?.variant? {
						Variant::StringValue(value) => value,
						Variant::IntegerValue(value) => value.to_string(),
						Variant::BoolValue(value) => value.to_string(),
					};

					Some(TermBucket { key, count: hit.count })
				})
				.collect();

			Ok(index::rank_buckets(buckets, aggregation.size))
		})
	}

	fn count<'a>(&'a self, filter: &'a FilterTree) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move { self.count_matches(to_filter(filter)?).await })
	}

	fn get_by_ids<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, Result<Vec<Resource>>> {
		Box::pin(async move {
			// Ids that are not UUIDs can never name a point.
			let points: Vec<PointId> = ids
				.iter()
				.filter(|id| Uuid::parse_str(id).is_ok())
				.map(|id| PointId::from(id.clone()))
				.collect();

			if points.is_empty() {
				return Ok(Vec::new());
			}

			let response = self
				.client
				.get_points(
					GetPointsBuilder::new(self.collection.clone(), points).with_payload(true),
				)
				.await?;
			let mut found: HashMap<String, Resource> = HashMap::new();

			for point in response.result {
				let document = point_to_resource(point)?;

				found.insert(document.id.clone(), document);
			}

			Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
		})
	}

	fn upsert<'a>(
		&'a self,
		document: &'a Resource,
		guard: WriteGuard,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			if Uuid::parse_str(&document.id).is_err() {
				return Err(Error::Backend(format!(
					"Document id {} is not a valid point id.",
					document.id
				)));
			}

			let current = self.stored_version(&document.id).await?;

			guard.check(&document.id, current)?;

			let version = current.map_or(1, |version| version + 1);
			let mut stored = document.clone();

			stored.version = version;

			let point = PointStruct::new(
				stored.id.clone(),
				PLACEHOLDER_VECTOR.to_vec(),
				resource_payload(&stored)?,
			);

			self.client
				.upsert_points(
					UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true),
				)
				.await?;

			Ok(version)
		})
	}

	fn delete_index<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.client.delete_collection(name.to_string()).await?;

			Ok(())
		})
	}

	fn refresh<'a>(&'a self, _name: &'a str) -> BoxFuture<'a, Result<()>> {
		// Upserts are issued with `wait`, so writes are searchable once acknowledged.
		Box::pin(async move { Ok(()) })
	}
}

/// Payload key a filter field is stored under. `_id` maps to the point id instead.
pub fn payload_key(field: Field) -> Option<&'static str> {
	match field {
		Field::Id => None,
		Field::AlbumId => Some("albums[].id"),
		other => Some(other.as_str()),
	}
}

/// Translates a filter tree into a Qdrant payload filter.
pub fn to_filter(tree: &FilterTree) -> Result<Filter> {
	match tree {
		FilterTree::And(nodes) => Ok(Filter::must(conditions(nodes)?)),
		FilterTree::Or(nodes) if nodes.is_empty() => Ok(match_nothing()),
		FilterTree::Or(nodes) => Ok(Filter::should(conditions(nodes)?)),
		FilterTree::Not(node) => Ok(Filter::must_not([to_condition(node)?])),
		leaf => Ok(Filter::must([to_condition(leaf)?])),
	}
}

fn conditions(nodes: &[FilterTree]) -> Result<Vec<Condition>> {
	nodes.iter().map(to_condition).collect()
}

fn to_condition(tree: &FilterTree) -> Result<Condition> {
	match tree {
		FilterTree::And(_) | FilterTree::Or(_) | FilterTree::Not(_) =>
			Ok(Condition::from(to_filter(tree)?)),
		FilterTree::Term { field: Field::Id, value } => Ok(Condition::has_id([point_id(value)?])),
		FilterTree::Terms { field: Field::Id, values } => Ok(Condition::has_id(
			values.iter().map(point_id).collect::<Result<Vec<_>>>()?,
		)),
		FilterTree::Term { field, value } => {
			let key = leaf_key(*field)?;

			match value {
				FilterValue::String(value) => Ok(Condition::matches(key, value.clone())),
				FilterValue::Bool(value) => Ok(Condition::matches(key, *value)),
				FilterValue::Integer(value) => Ok(Condition::matches(key, integer(*value)?)),
				FilterValue::DateTime(value) => Ok(Condition::datetime_range(
					key,
					DatetimeRange {
						gte: Some(timestamp(value)),
						lte: Some(timestamp(value)),
						..Default::default()
					},
				)),
			}
		},
		FilterTree::Terms { field, values } => terms_condition(leaf_key(*field)?, values),
		FilterTree::Range { field, from, to, include_lower, include_upper } => range_condition(
			leaf_key(*field)?,
			from.as_ref(),
			to.as_ref(),
			*include_lower,
			*include_upper,
		),
	}
}

fn terms_condition(key: &str, values: &[FilterValue]) -> Result<Condition> {
	if values.iter().all(|value| matches!(value, FilterValue::String(_))) {
		let keywords = values
			.iter()
			.filter_map(|value| match value {
				FilterValue::String(value) => Some(value.clone()),
				_ => None,
			})
			.collect::<Vec<_>>();

		return Ok(Condition::matches(key, keywords));
	}

	let mut integers = Vec::with_capacity(values.len());

	for value in values {
		match value {
			FilterValue::Integer(value) => integers.push(integer(*value)?),
			other => {
				return Err(Error::Backend(format!(
					"Mixed or unsupported terms value {other:?} for {key}."
				)));
			},
		}
	}

	Ok(Condition::matches(key, integers))
}

fn range_condition(
	key: &str,
	from: Option<&FilterValue>,
	to: Option<&FilterValue>,
	include_lower: bool,
	include_upper: bool,
) -> Result<Condition> {
	match (from, to) {
		(None, None) => Ok(Condition::from(Filter::must_not([Condition::is_empty(key)]))),
		(Some(FilterValue::DateTime(_)), _) | (_, Some(FilterValue::DateTime(_))) => {
			let from = from.map(datetime_bound).transpose()?;
			let to = to.map(datetime_bound).transpose()?;
			let mut range = DatetimeRange::default();

			if include_lower {
				range.gte = from;
			} else {
				range.gt = from;
			}
			if include_upper {
				range.lte = to;
			} else {
				range.lt = to;
			}

			Ok(Condition::datetime_range(key, range))
		},
		_ => {
			let from = from.map(number_bound).transpose()?;
			let to = to.map(number_bound).transpose()?;
			let mut range = Range::default();

			if include_lower {
				range.gte = from;
			} else {
				range.gt = from;
			}
			if include_upper {
				range.lte = to;
			} else {
				range.lt = to;
			}

			Ok(Condition::range(key, range))
		},
	}
}

fn leaf_key(field: Field) -> Result<&'static str> {
	payload_key(field)
		.ok_or_else(|| Error::Backend(format!("Field {field} cannot be used in this position.")))
}

fn point_id(value: &FilterValue) -> Result<PointId> {
	match value {
		FilterValue::String(id) => Ok(PointId::from(id.clone())),
		other => Err(Error::Backend(format!("Document ids must be strings, got {other:?}."))),
	}
}

fn integer(value: u64) -> Result<i64> {
	i64::try_from(value).map_err(|_| Error::Backend(format!("Integer {value} exceeds i64.")))
}

fn datetime_bound(value: &FilterValue) -> Result<Timestamp> {
	match value {
		FilterValue::DateTime(value) => Ok(timestamp(value)),
		other => Err(Error::Backend(format!("Expected a datetime bound, got {other:?}."))),
	}
}

fn number_bound(value: &FilterValue) -> Result<f64> {
	match value {
		FilterValue::Integer(value) => Ok(*value as f64),
		other => Err(Error::Backend(format!("Expected a numeric bound, got {other:?}."))),
	}
}

fn timestamp(value: &OffsetDateTime) -> Timestamp {
	Timestamp { seconds: value.unix_timestamp(), nanos: value.nanosecond() as i32 }
}

fn match_nothing() -> Filter {
	Filter::must([Condition::has_id(Vec::<PointId>::new())])
}

fn aggregation_key(field: AggregationField) -> &'static str {
	match field {
		AggregationField::PeopleId => "people[].id",
		AggregationField::Tags => "tags",
	}
}

fn field_type(kind: FieldKind) -> Option<FieldType> {
	match kind {
		FieldKind::Keyword => Some(FieldType::Keyword),
		FieldKind::Integer => Some(FieldType::Integer),
		FieldKind::Boolean => Some(FieldType::Bool),
		FieldKind::Datetime => Some(FieldType::Datetime),
		FieldKind::Text => Some(FieldType::Text),
		FieldKind::Stored => None,
	}
}

fn resource_payload(resource: &Resource) -> Result<Payload> {
	let JsonValue::Object(fields) = serde_json::to_value(resource)? else {
		return Err(Error::Backend("Resources must serialize to an object.".to_string()));
	};
	let mut payload = Payload::new();

	for (key, value) in fields {
		payload.insert(key, value);
	}

	Ok(payload)
}

fn point_to_resource(point: RetrievedPoint) -> Result<Resource> {
	let mut fields = Map::new();

	for (key, value) in point.payload {
		fields.insert(key, value_to_json(value));
	}

	Ok(serde_json::from_value(JsonValue::Object(fields))?)
}

/// Converts a payload value back into JSON.
pub fn value_to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(value)) => JsonValue::Bool(value),
		Some(Kind::IntegerValue(value)) => JsonValue::from(value),
		Some(Kind::DoubleValue(value)) => JsonValue::from(value),
		Some(Kind::StringValue(value)) => JsonValue::String(value),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.into_iter().map(|(key, value)| (key, value_to_json(value))).collect(),
		),
	}
}
