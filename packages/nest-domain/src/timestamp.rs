use serde::{Deserialize, Deserializer, Serializer};
use time::{
	Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
	macros::format_description,
};

/// Parses the timestamp formats accepted for `since`/`until` and stored documents.
///
/// RFC 3339 is tried first. Naive `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and bare
/// `YYYY-MM-DD` values are read as UTC.
pub fn parse(text: &str) -> Option<OffsetDateTime> {
	let text = text.trim();

	if let Ok(value) = OffsetDateTime::parse(text, &Rfc3339) {
		return Some(value);
	}

	let naive = [
		format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
		format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
	];

	for format in naive {
		if let Ok(value) = PrimitiveDateTime::parse(text, format) {
			return Some(value.assume_utc());
		}
	}

	Date::parse(text, format_description!("[year]-[month]-[day]"))
		.ok()
		.map(|date| date.midnight().assume_utc())
}

pub fn format(value: &OffsetDateTime) -> String {
	value.format(&Rfc3339).unwrap_or_default()
}

/// Serde adapter for `Option<OffsetDateTime>` fields on documents.
pub mod option {
	use super::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Unix(i64),
	}

	pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => {
				let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

				serializer.serialize_str(&formatted)
			},
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<Raw>::deserialize(deserializer)? {
			Some(Raw::Text(text)) => parse(&text).map(Some).ok_or_else(|| {
				serde::de::Error::custom(format!("unsupported timestamp '{text}'"))
			}),
			Some(Raw::Unix(seconds)) => OffsetDateTime::from_unix_timestamp(seconds)
				.map(Some)
				.map_err(serde::de::Error::custom),
			None => Ok(None),
		}
	}
}
