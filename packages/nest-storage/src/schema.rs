#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
	/// Exact-match string.
	Keyword,
	Integer,
	Boolean,
	Datetime,
	/// Tokenized full text.
	Text,
	/// Kept in the document but never indexed.
	Stored,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaField {
	/// Payload path; nested array members use the `parent[].child` form.
	pub path: &'static str,
	pub kind: FieldKind,
}

/// Field mapping of an index, built once and handed to the adapter that creates the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSchema {
	pub fields: Vec<SchemaField>,
}
impl IndexSchema {
	/// Mapping of the resources index.
	pub fn resources() -> Self {
		let fields = [
			("provider", FieldKind::Keyword),
			("external_id", FieldKind::Integer),
			("owner_uid", FieldKind::Keyword),
			("owner_nickname", FieldKind::Keyword),
			("title", FieldKind::Text),
			("description", FieldKind::Text),
			("url", FieldKind::Stored),
			("type", FieldKind::Keyword),
			("height", FieldKind::Stored),
			("width", FieldKind::Stored),
			("download_url", FieldKind::Stored),
			("thumbnail_url", FieldKind::Stored),
			("thumbnail_height", FieldKind::Stored),
			("thumbnail_width", FieldKind::Stored),
			("html", FieldKind::Stored),
			("owned", FieldKind::Boolean),
			("tags", FieldKind::Keyword),
			("albums[].id", FieldKind::Keyword),
			("people[].id", FieldKind::Keyword),
			("nests", FieldKind::Integer),
			("removed", FieldKind::Boolean),
			("version", FieldKind::Integer),
			("created_at", FieldKind::Datetime),
			("updated_at", FieldKind::Datetime),
			("uploaded_at", FieldKind::Datetime),
			("taken_at", FieldKind::Datetime),
		];

		Self { fields: fields.into_iter().map(|(path, kind)| SchemaField { path, kind }).collect() }
	}

	pub fn field(&self, path: &str) -> Option<&SchemaField> {
		self.fields.iter().find(|field| field.path == path)
	}

	pub fn indexed(&self) -> impl Iterator<Item = &SchemaField> {
		self.fields.iter().filter(|field| field.kind != FieldKind::Stored)
	}
}
