use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
};

use serde_json::Value;
use time::OffsetDateTime;

use crate::timestamp;

/// The closed set of document fields a filter leaf may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
	Provider,
	OwnerUid,
	Tags,
	AlbumId,
	Id,
	UploadedAt,
	ExternalId,
	Removed,
}
impl Field {
	pub const ALL: [Self; 8] = [
		Self::Provider,
		Self::OwnerUid,
		Self::Tags,
		Self::AlbumId,
		Self::Id,
		Self::UploadedAt,
		Self::ExternalId,
		Self::Removed,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Provider => "provider",
			Self::OwnerUid => "owner_uid",
			Self::Tags => "tags",
			Self::AlbumId => "albums.id",
			Self::Id => "_id",
			Self::UploadedAt => "uploaded_at",
			Self::ExternalId => "external_id",
			Self::Removed => "removed",
		}
	}
}
impl Display for Field {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterValue {
	String(String),
	Integer(u64),
	Bool(bool),
	DateTime(OffsetDateTime),
}
impl FilterValue {
	pub fn to_value(&self) -> Value {
		match self {
			Self::String(value) => Value::String(value.clone()),
			Self::Integer(value) => serde_json::json!(value),
			Self::Bool(value) => Value::Bool(*value),
			Self::DateTime(value) => Value::String(timestamp::format(value)),
		}
	}

	/// Orders two values of the same kind. Values of different kinds are incomparable.
	pub fn compare(&self, other: &Self) -> Option<Ordering> {
		match (self, other) {
			(Self::String(lhs), Self::String(rhs)) => Some(lhs.cmp(rhs)),
			(Self::Integer(lhs), Self::Integer(rhs)) => Some(lhs.cmp(rhs)),
			(Self::Bool(lhs), Self::Bool(rhs)) => Some(lhs.cmp(rhs)),
			(Self::DateTime(lhs), Self::DateTime(rhs)) => Some(lhs.cmp(rhs)),
			_ => None,
		}
	}
}
impl From<&str> for FilterValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}
impl From<String> for FilterValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}
impl From<&String> for FilterValue {
	fn from(value: &String) -> Self {
		Self::String(value.clone())
	}
}
impl From<u64> for FilterValue {
	fn from(value: u64) -> Self {
		Self::Integer(value)
	}
}
impl From<bool> for FilterValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl From<OffsetDateTime> for FilterValue {
	fn from(value: OffsetDateTime) -> Self {
		Self::DateTime(value)
	}
}

/// Anything a filter can be evaluated against. Multi-valued fields return every value.
pub trait FieldSource {
	fn field_values(&self, field: Field) -> Vec<FilterValue>;
}

/// Engine-agnostic boolean filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterTree {
	And(Vec<FilterTree>),
	Or(Vec<FilterTree>),
	Not(Box<FilterTree>),
	Term {
		field: Field,
		value: FilterValue,
	},
	Terms {
		field: Field,
		values: Vec<FilterValue>,
	},
	Range {
		field: Field,
		from: Option<FilterValue>,
		to: Option<FilterValue>,
		include_lower: bool,
		include_upper: bool,
	},
}
impl FilterTree {
	pub fn term(field: Field, value: impl Into<FilterValue>) -> Self {
		Self::Term { field, value: value.into() }
	}

	pub fn terms<I, V>(field: Field, values: I) -> Self
	where
		I: IntoIterator<Item = V>,
		V: Into<FilterValue>,
	{
		Self::Terms { field, values: values.into_iter().map(Into::into).collect() }
	}

	pub fn not(node: Self) -> Self {
		Self::Not(Box::new(node))
	}

	pub fn range(
		field: Field,
		from: Option<FilterValue>,
		to: Option<FilterValue>,
		include_lower: bool,
		include_upper: bool,
	) -> Self {
		Self::Range { field, from, to, include_lower, include_upper }
	}

	/// Matches every document.
	pub fn match_all() -> Self {
		Self::And(Vec::new())
	}

	pub fn to_value(&self) -> Value {
		match self {
			Self::And(nodes) => serde_json::json!({
				"op": "and",
				"args": Value::Array(nodes.iter().map(Self::to_value).collect()),
			}),
			Self::Or(nodes) => serde_json::json!({
				"op": "or",
				"args": Value::Array(nodes.iter().map(Self::to_value).collect()),
			}),
			Self::Not(node) => serde_json::json!({ "op": "not", "expr": node.to_value() }),
			Self::Term { field, value } => serde_json::json!({
				"op": "term",
				"field": field.as_str(),
				"value": value.to_value(),
			}),
			Self::Terms { field, values } => serde_json::json!({
				"op": "terms",
				"field": field.as_str(),
				"value": Value::Array(values.iter().map(FilterValue::to_value).collect()),
			}),
			Self::Range { field, from, to, include_lower, include_upper } => serde_json::json!({
				"op": "range",
				"field": field.as_str(),
				"from": from.as_ref().map(FilterValue::to_value),
				"to": to.as_ref().map(FilterValue::to_value),
				"include_lower": include_lower,
				"include_upper": include_upper,
			}),
		}
	}

	pub fn matches<S>(&self, source: &S) -> bool
	where
		S: FieldSource + ?Sized,
	{
		match self {
			Self::And(nodes) => nodes.iter().all(|node| node.matches(source)),
			Self::Or(nodes) => nodes.iter().any(|node| node.matches(source)),
			Self::Not(node) => !node.matches(source),
			Self::Term { field, value } =>
				source.field_values(*field).iter().any(|candidate| candidate == value),
			Self::Terms { field, values } => source
				.field_values(*field)
				.iter()
				.any(|candidate| values.iter().any(|value| candidate == value)),
			Self::Range { field, from, to, include_lower, include_upper } =>
				source.field_values(*field).iter().any(|candidate| {
					within_lower(candidate, from.as_ref(), *include_lower)
						&& within_upper(candidate, to.as_ref(), *include_upper)
				}),
		}
	}
}

fn within_lower(candidate: &FilterValue, bound: Option<&FilterValue>, inclusive: bool) -> bool {
	let Some(bound) = bound else {
		return true;
	};

	match candidate.compare(bound) {
		Some(Ordering::Greater) => true,
		Some(Ordering::Equal) => inclusive,
		_ => false,
	}
}

fn within_upper(candidate: &FilterValue, bound: Option<&FilterValue>, inclusive: bool) -> bool {
	let Some(bound) = bound else {
		return true;
	};

	match candidate.compare(bound) {
		Some(Ordering::Less) => true,
		Some(Ordering::Equal) => inclusive,
		_ => false,
	}
}
