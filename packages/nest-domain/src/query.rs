use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
	Error, Field, FilterTree, FilterValue, Resource, Result, Sources, provider, timestamp,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
	#[default]
	UploadedAt,
	CreatedAt,
	UpdatedAt,
	TakenAt,
	ExternalId,
}
impl SortField {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::UploadedAt => "uploaded_at",
			Self::CreatedAt => "created_at",
			Self::UpdatedAt => "updated_at",
			Self::TakenAt => "taken_at",
			Self::ExternalId => "external_id",
		}
	}

	/// Whether a page cursor can be expressed for this sort. Filters reach only `uploaded_at`
	/// and `external_id`.
	pub fn supports_cursor(&self) -> bool {
		matches!(self, Self::UploadedAt | Self::ExternalId)
	}
}
impl Display for SortField {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for SortField {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"uploaded_at" => Ok(Self::UploadedAt),
			"created_at" => Ok(Self::CreatedAt),
			"updated_at" => Ok(Self::UpdatedAt),
			"taken_at" => Ok(Self::TakenAt),
			"external_id" => Ok(Self::ExternalId),
			other => Err(Error::InvalidArgument(format!("Unsupported sort field '{other}'."))),
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	Asc,
	#[default]
	Desc,
}
impl SortDirection {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Asc => "asc",
			Self::Desc => "desc",
		}
	}

	pub fn reverse(self) -> Self {
		match self {
			Self::Asc => Self::Desc,
			Self::Desc => Self::Asc,
		}
	}
}
impl FromStr for SortDirection {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"asc" => Ok(Self::Asc),
			"desc" => Ok(Self::Desc),
			other => Err(Error::InvalidArgument(format!("Unsupported sort direction '{other}'."))),
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortKey {
	pub field: SortField,
	pub direction: SortDirection,
}

/// A `since`/`until` value as supplied by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeBound {
	At(OffsetDateTime),
	/// Seconds since the Unix epoch.
	Unix(i64),
	Text(String),
}
impl TimeBound {
	pub fn resolve(&self) -> Result<OffsetDateTime> {
		match self {
			Self::At(value) => Ok(*value),
			Self::Unix(seconds) => OffsetDateTime::from_unix_timestamp(*seconds).map_err(|_| {
				Error::InvalidArgument(format!("Timestamp {seconds} is out of range."))
			}),
			Self::Text(text) => timestamp::parse(text)
				.ok_or_else(|| Error::InvalidArgument(format!("Unparseable date '{text}'."))),
		}
	}
}
impl From<OffsetDateTime> for TimeBound {
	fn from(value: OffsetDateTime) -> Self {
		Self::At(value)
	}
}
impl From<&str> for TimeBound {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}
impl From<String> for TimeBound {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

/// Position of the last row of a page, used to request the rows strictly after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
	#[serde(with = "timestamp::option", default)]
	pub uploaded_at: Option<OffsetDateTime>,
	pub external_id: u64,
}
impl PageCursor {
	pub fn of(resource: &Resource) -> Self {
		Self { uploaded_at: resource.uploaded_at, external_id: resource.external_id }
	}
}

/// Where the cursor row sits in the `uploaded_at` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorAnchor {
	UploadedAt(OffsetDateTime),
	/// The row has no `uploaded_at` and belongs to the trailing undated block.
	Undated,
}

/// Offset window derived from `page`/`page_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
	pub from: u64,
	pub size: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchOptions {
	pub sort_by: SortField,
	pub sort_direction: SortDirection,
	/// 1-based.
	pub page: u32,
	/// Falls back to the configured default when absent.
	pub page_size: Option<u32>,
	/// Exclusive lower bound on `uploaded_at`.
	pub since: Option<TimeBound>,
	/// Exclusive upper bound on `uploaded_at`.
	pub until: Option<TimeBound>,
	pub exclude: Vec<String>,
	pub external_id_cursor: Option<u64>,
	/// Set by [`FetchOptions::after`] when sorting by `uploaded_at`.
	pub cursor_anchor: Option<CursorAnchor>,
	/// Membership-check mode: restricts the query to this document id.
	pub id: Option<String>,
}
impl FetchOptions {
	pub fn sorted(mut self, field: SortField, direction: SortDirection) -> Self {
		self.sort_by = field;
		self.sort_direction = direction;

		self
	}

	pub fn paged(mut self, page: u32, page_size: u32) -> Self {
		self.page = page;
		self.page_size = Some(page_size);

		self
	}

	pub fn since(mut self, bound: impl Into<TimeBound>) -> Self {
		self.since = Some(bound.into());

		self
	}

	pub fn until(mut self, bound: impl Into<TimeBound>) -> Self {
		self.until = Some(bound.into());

		self
	}

	pub fn excluding<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.exclude.extend(ids.into_iter().map(Into::into));

		self
	}

	/// Options for the page following `cursor` in the same traversal direction.
	///
	/// When sorting by `uploaded_at` the cursor row's timestamp anchors the next page, so
	/// duplicate timestamps are resolved by `external_id` and undated rows are still reached.
	pub fn after(&self, cursor: &PageCursor) -> Self {
		let mut next = self.clone();

		next.page = 1;
		next.external_id_cursor = Some(cursor.external_id);
		next.cursor_anchor = (self.sort_by == SortField::UploadedAt).then(|| {
			match cursor.uploaded_at {
				Some(at) => CursorAnchor::UploadedAt(at),
				None => CursorAnchor::Undated,
			}
		});

		next
	}

	pub fn window(&self, default_page_size: u32, max_page_size: u32) -> Result<PageWindow> {
		let size = self.page_size.unwrap_or(default_page_size);

		if self.page < 1 {
			return Err(Error::InvalidArgument("page must be at least 1.".to_string()));
		}
		if size < 1 {
			return Err(Error::InvalidArgument("page_size must be at least 1.".to_string()));
		}
		if size > max_page_size {
			return Err(Error::InvalidArgument(format!(
				"page_size must not exceed {max_page_size}."
			)));
		}

		Ok(PageWindow { from: u64::from(size) * u64::from(self.page - 1), size })
	}
}
impl Default for FetchOptions {
	fn default() -> Self {
		Self {
			sort_by: SortField::default(),
			sort_direction: SortDirection::default(),
			page: 1,
			page_size: None,
			since: None,
			until: None,
			exclude: Vec::new(),
			external_id_cursor: None,
			cursor_anchor: None,
			id: None,
		}
	}
}

/// Primary sort followed by the `external_id` tie-break, both in the requested direction.
pub fn sort_keys(opts: &FetchOptions) -> Vec<SortKey> {
	let primary = SortKey { field: opts.sort_by, direction: opts.sort_direction };

	if opts.sort_by == SortField::ExternalId {
		return vec![primary];
	}

	vec![primary, SortKey { field: SortField::ExternalId, direction: opts.sort_direction }]
}

/// Builds the complete nest filter, or `None` when `sources` is empty.
pub fn build_query_filter(sources: &Sources, opts: &FetchOptions) -> Result<Option<FilterTree>> {
	validate_cursor(opts)?;

	if sources.is_empty() {
		return Ok(None);
	}

	let since = opts.since.as_ref().map(TimeBound::resolve).transpose()?;
	let until = opts.until.as_ref().map(TimeBound::resolve).transpose()?;
	let mut conjuncts = vec![provider::build_provider_filter(sources)?];

	if let Some(id) = &opts.id {
		conjuncts.push(FilterTree::term(Field::Id, id.as_str()));
	} else {
		conjuncts.extend(window_filters(opts, since, until));

		if !opts.exclude.is_empty() {
			conjuncts.push(FilterTree::not(FilterTree::terms(Field::Id, opts.exclude.iter())));
		}
	}

	conjuncts.push(FilterTree::term(Field::Removed, false));

	Ok(Some(FilterTree::And(conjuncts)))
}

fn validate_cursor(opts: &FetchOptions) -> Result<()> {
	if opts.external_id_cursor.is_some() && !opts.sort_by.supports_cursor() {
		return Err(Error::InvalidArgument(format!(
			"Cursor paging is not supported when sorting by {}.",
			opts.sort_by
		)));
	}
	if opts.cursor_anchor.is_some()
		&& (opts.sort_by != SortField::UploadedAt || opts.external_id_cursor.is_none())
	{
		return Err(Error::InvalidArgument(
			"A cursor anchor needs an uploaded_at sort and an external_id cursor.".to_string(),
		));
	}

	Ok(())
}

fn window_filters(
	opts: &FetchOptions,
	since: Option<OffsetDateTime>,
	until: Option<OffsetDateTime>,
) -> Vec<FilterTree> {
	let mut filters = Vec::new();
	let Some(cursor) = opts.external_id_cursor else {
		if since.is_some() || until.is_some() {
			filters.push(uploaded_range(since, until));
		}

		return filters;
	};
	let beyond_id = external_id_beyond(cursor, opts.sort_direction);

	if let Some(anchor) = opts.cursor_anchor {
		if since.is_some() || until.is_some() {
			filters.push(uploaded_range(since, until));
		}

		filters.push(match anchor {
			CursorAnchor::UploadedAt(at) => FilterTree::Or(vec![
				uploaded_beyond(at, opts.sort_direction),
				FilterTree::And(vec![uploaded_tied(at), beyond_id]),
				undated(),
			]),
			CursorAnchor::Undated => FilterTree::And(vec![undated(), beyond_id]),
		});

		return filters;
	}

	let (trailing, leading) = match opts.sort_direction {
		SortDirection::Desc => (since, until),
		SortDirection::Asc => (until, since),
	};

	match (opts.sort_by, leading) {
		(SortField::UploadedAt, Some(leading)) => {
			if let Some(trailing) = trailing {
				filters.push(uploaded_beyond(trailing, opts.sort_direction.reverse()));
			}

			filters.push(FilterTree::Or(vec![
				uploaded_beyond(leading, opts.sort_direction),
				FilterTree::And(vec![uploaded_tied(leading), beyond_id]),
			]));
		},
		_ => {
			if since.is_some() || until.is_some() {
				filters.push(uploaded_range(since, until));
			}

			filters.push(beyond_id);
		},
	}

	filters
}

fn uploaded_range(since: Option<OffsetDateTime>, until: Option<OffsetDateTime>) -> FilterTree {
	FilterTree::range(
		Field::UploadedAt,
		since.map(FilterValue::DateTime),
		until.map(FilterValue::DateTime),
		since.is_none(),
		until.is_none(),
	)
}

/// Rows strictly after `at` when traversing in `direction`.
fn uploaded_beyond(at: OffsetDateTime, direction: SortDirection) -> FilterTree {
	match direction {
		SortDirection::Desc => uploaded_range(None, Some(at)),
		SortDirection::Asc => uploaded_range(Some(at), None),
	}
}

fn uploaded_tied(at: OffsetDateTime) -> FilterTree {
	FilterTree::range(
		Field::UploadedAt,
		Some(FilterValue::DateTime(at)),
		Some(FilterValue::DateTime(at)),
		true,
		true,
	)
}

/// Documents without `uploaded_at`; an unbounded range matches any present value.
fn undated() -> FilterTree {
	FilterTree::not(FilterTree::range(Field::UploadedAt, None, None, true, true))
}

fn external_id_beyond(cursor: u64, direction: SortDirection) -> FilterTree {
	let bound = Some(FilterValue::Integer(cursor));

	match direction {
		SortDirection::Asc => FilterTree::range(Field::ExternalId, bound, None, false, true),
		SortDirection::Desc => FilterTree::range(Field::ExternalId, None, bound, true, false),
	}
}
