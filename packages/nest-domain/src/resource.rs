use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Field, FilterValue, SortField, filter::FieldSource, hashtag, timestamp};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Album {
	pub id: String,
	#[serde(default)]
	pub name: String,
}
impl Album {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self { id: id.into(), name: name.into() }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Person {
	pub id: String,
	#[serde(default)]
	pub name: String,
}
impl Person {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self { id: id.into(), name: name.into() }
	}
}

/// A media item document as stored in the index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
	#[serde(default)]
	pub id: String,
	pub provider: String,
	pub external_id: u64,
	#[serde(default)]
	pub owner_uid: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_nickname: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub kind: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub height: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub download_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_height: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_width: Option<u32>,
	/// Provider-rendered embed markup.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub html: Option<String>,
	/// Whether the nest owner also owns the media.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owned: Option<bool>,
	#[serde(default)]
	pub tags: BTreeSet<String>,
	#[serde(default)]
	pub albums: Vec<Album>,
	#[serde(default)]
	pub people: Vec<Person>,
	#[serde(default)]
	pub nests: BTreeSet<i64>,
	#[serde(default)]
	pub removed: bool,
	/// Managed by the index; bumped on every accepted write.
	#[serde(default)]
	pub version: u64,
	#[serde(with = "timestamp::option", default)]
	pub created_at: Option<OffsetDateTime>,
	#[serde(with = "timestamp::option", default)]
	pub updated_at: Option<OffsetDateTime>,
	#[serde(with = "timestamp::option", default)]
	pub uploaded_at: Option<OffsetDateTime>,
	#[serde(with = "timestamp::option", default)]
	pub taken_at: Option<OffsetDateTime>,
	/// Single-album field written by older indexes. Read only, never written back.
	#[serde(default, skip_serializing)]
	pub album: Option<Album>,
}
impl Resource {
	pub fn new(
		provider: impl Into<String>,
		external_id: u64,
		owner_uid: impl Into<String>,
	) -> Self {
		let mut resource = Self {
			provider: provider.into(),
			external_id,
			owner_uid: owner_uid.into(),
			..Default::default()
		};

		resource.assign_id();

		resource
	}

	/// Recomputes `id` from `provider` and `external_id`.
	pub fn assign_id(&mut self) {
		self.id = resource_id(&self.provider, self.external_id);
	}

	/// Adds hashtags found in the title and description to `tags`.
	pub fn absorb_hashtags(&mut self) {
		for text in [self.title.as_deref(), self.description.as_deref()].into_iter().flatten() {
			self.tags.extend(hashtag::extract_hashtags(text));
		}
	}

	/// Moves a legacy single `album` into `albums` when `albums` is empty.
	pub fn absorb_legacy_album(&mut self) -> bool {
		let Some(album) = self.album.take() else {
			return false;
		};

		if !self.albums.is_empty() {
			return false;
		}

		self.albums.push(album);

		true
	}

	pub fn album_ids(&self) -> impl Iterator<Item = &str> {
		self.albums.iter().map(|album| album.id.as_str())
	}

	pub fn sort_value(&self, field: SortField) -> Option<FilterValue> {
		let at = match field {
			SortField::UploadedAt => self.uploaded_at,
			SortField::CreatedAt => self.created_at,
			SortField::UpdatedAt => self.updated_at,
			SortField::TakenAt => self.taken_at,
			SortField::ExternalId => return Some(FilterValue::Integer(self.external_id)),
		};

		at.map(FilterValue::DateTime)
	}
}
impl FieldSource for Resource {
	fn field_values(&self, field: Field) -> Vec<FilterValue> {
		match field {
			Field::Provider => vec![FilterValue::from(self.provider.as_str())],
			Field::OwnerUid => vec![FilterValue::from(self.owner_uid.as_str())],
			Field::Tags => self.tags.iter().map(FilterValue::from).collect(),
			Field::AlbumId => self.album_ids().map(FilterValue::from).collect(),
			Field::Id => vec![FilterValue::from(self.id.as_str())],
			Field::UploadedAt => self.uploaded_at.map(FilterValue::DateTime).into_iter().collect(),
			Field::ExternalId => vec![FilterValue::Integer(self.external_id)],
			Field::Removed => vec![FilterValue::Bool(self.removed)],
		}
	}
}

/// Deterministic document id: UUIDv5 of `"{provider}:{external_id}"`, provider lower-cased.
pub fn resource_id(provider: &str, external_id: u64) -> String {
	let name = format!("{}:{external_id}", provider.trim().to_ascii_lowercase());

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
