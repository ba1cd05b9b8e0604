use std::{
	collections::BTreeMap,
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Field, FilterTree, Result};

/// Raw per-provider filter description as supplied by callers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
	#[serde(default)]
	pub albums: Vec<String>,
	/// Owner uid mapped to the tags contributed by that owner.
	#[serde(default)]
	pub tags: BTreeMap<String, Vec<String>>,
}
impl SourceSpec {
	pub fn albums<I, S>(albums: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { albums: albums.into_iter().map(Into::into).collect(), tags: BTreeMap::new() }
	}

	pub fn tags<I, S>(owner_uid: impl Into<String>, tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::default().with_owner(owner_uid, tags)
	}

	pub fn with_owner<I, S>(mut self, owner_uid: impl Into<String>, tags: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.tags.insert(owner_uid.into(), tags.into_iter().map(Into::into).collect());

		self
	}
}

/// Provider name mapped to its filter description.
pub type Sources = BTreeMap<String, SourceSpec>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Provider {
	Facebook,
	Instagram,
	Birdbox,
	Email,
}
impl Provider {
	pub const ALL: [Self; 4] = [Self::Facebook, Self::Instagram, Self::Birdbox, Self::Email];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Facebook => "facebook",
			Self::Instagram => "instagram",
			Self::Birdbox => "birdbox",
			Self::Email => "email",
		}
	}
}
impl Display for Provider {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Provider {
	type Err = Error;

	fn from_str(name: &str) -> Result<Self> {
		lookup(name).map(|registration| registration.provider)
	}
}

/// One owner and the non-empty tag set they contribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnerTags {
	pub owner_uid: String,
	pub tags: Vec<String>,
}

/// Albums and/or owner tags; at least one side is non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumTagFilter {
	pub albums: Vec<String>,
	pub owners: Vec<OwnerTags>,
}

/// Owner tags only; never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFilter {
	pub owners: Vec<OwnerTags>,
}

/// A validated source for one known provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderSource {
	Facebook(AlbumTagFilter),
	Instagram(TagFilter),
	Birdbox(TagFilter),
	Email(TagFilter),
}
impl ProviderSource {
	/// Validates `spec` against the minimum-filter rule of the named provider.
	pub fn from_spec(name: &str, spec: &SourceSpec) -> Result<Self> {
		(lookup(name)?.validate)(spec)
	}

	pub fn provider(&self) -> Provider {
		match self {
			Self::Facebook(_) => Provider::Facebook,
			Self::Instagram(_) => Provider::Instagram,
			Self::Birdbox(_) => Provider::Birdbox,
			Self::Email(_) => Provider::Email,
		}
	}

	pub fn statement(&self) -> FilterTree {
		let provider = self.provider();

		match self {
			Self::Facebook(filter) => {
				let tags = (!filter.owners.is_empty())
					.then(|| tag_statement(provider, &filter.owners));
				let albums = (!filter.albums.is_empty())
					.then(|| album_statement(provider, &filter.albums));

				match (tags, albums) {
					(Some(tags), Some(albums)) => FilterTree::Or(vec![tags, albums]),
					(Some(statement), None) | (None, Some(statement)) => statement,
					// Unreachable through `from_spec`; an empty filter matches nothing.
					(None, None) => FilterTree::Or(Vec::new()),
				}
			},
			Self::Instagram(filter) | Self::Birdbox(filter) | Self::Email(filter) =>
				tag_statement(provider, &filter.owners),
		}
	}
}

/// Builds the provider part of a nest query: one statement per provider, OR-ed together.
pub fn build_provider_filter(sources: &Sources) -> Result<FilterTree> {
	let mut statements = sources
		.iter()
		.map(|(name, spec)| ProviderSource::from_spec(name, spec).map(|source| source.statement()))
		.collect::<Result<Vec<_>>>()?;

	match statements.len() {
		0 => Err(Error::InvalidSpecification("At least one provider is required.".to_string())),
		1 => Ok(statements.remove(0)),
		_ => Ok(FilterTree::Or(statements)),
	}
}

struct Registration {
	provider: Provider,
	validate: fn(&SourceSpec) -> Result<ProviderSource>,
}

static REGISTRY: [Registration; 4] = [
	Registration { provider: Provider::Facebook, validate: validate_facebook },
	Registration { provider: Provider::Instagram, validate: validate_instagram },
	Registration { provider: Provider::Birdbox, validate: validate_birdbox },
	Registration { provider: Provider::Email, validate: validate_email },
];

fn lookup(name: &str) -> Result<&'static Registration> {
	let name = name.trim();

	REGISTRY
		.iter()
		.find(|registration| registration.provider.as_str().eq_ignore_ascii_case(name))
		.ok_or_else(|| Error::InvalidSpecification(format!("Unsupported provider '{name}'.")))
}

fn validate_facebook(spec: &SourceSpec) -> Result<ProviderSource> {
	if spec.albums.is_empty() && spec.tags.is_empty() {
		return Err(Error::InvalidSpecification(
			"facebook sources require albums or tags.".to_string(),
		));
	}

	let owners = owner_tags(Provider::Facebook, spec)?;

	Ok(ProviderSource::Facebook(AlbumTagFilter { albums: spec.albums.clone(), owners }))
}

fn validate_instagram(spec: &SourceSpec) -> Result<ProviderSource> {
	validate_tags(Provider::Instagram, spec).map(ProviderSource::Instagram)
}

fn validate_birdbox(spec: &SourceSpec) -> Result<ProviderSource> {
	validate_tags(Provider::Birdbox, spec).map(ProviderSource::Birdbox)
}

fn validate_email(spec: &SourceSpec) -> Result<ProviderSource> {
	validate_tags(Provider::Email, spec).map(ProviderSource::Email)
}

fn validate_tags(provider: Provider, spec: &SourceSpec) -> Result<TagFilter> {
	if spec.tags.is_empty() {
		return Err(Error::InvalidSpecification(format!("{provider} sources require tags.")));
	}

	Ok(TagFilter { owners: owner_tags(provider, spec)? })
}

fn owner_tags(provider: Provider, spec: &SourceSpec) -> Result<Vec<OwnerTags>> {
	spec.tags
		.iter()
		.map(|(owner_uid, tags)| {
			if owner_uid.trim().is_empty() {
				return Err(Error::InvalidSpecification(format!(
					"{provider} tag owners must be non-empty."
				)));
			}
			if tags.is_empty() {
				return Err(Error::InvalidSpecification(format!(
					"{provider} owner '{owner_uid}' has no tags."
				)));
			}

			Ok(OwnerTags { owner_uid: owner_uid.clone(), tags: tags.clone() })
		})
		.collect()
}

fn tag_statement(provider: Provider, owners: &[OwnerTags]) -> FilterTree {
	let provider_term = FilterTree::term(Field::Provider, provider.as_str());

	if let [owner] = owners {
		return FilterTree::And(vec![
			provider_term,
			FilterTree::term(Field::OwnerUid, owner.owner_uid.as_str()),
			FilterTree::terms(Field::Tags, owner.tags.iter()),
		]);
	}

	let per_owner = owners
		.iter()
		.map(|owner| {
			FilterTree::And(vec![
				FilterTree::term(Field::OwnerUid, owner.owner_uid.as_str()),
				FilterTree::terms(Field::Tags, owner.tags.iter()),
			])
		})
		.collect();

	FilterTree::And(vec![provider_term, FilterTree::Or(per_owner)])
}

fn album_statement(provider: Provider, albums: &[String]) -> FilterTree {
	FilterTree::And(vec![
		FilterTree::term(Field::Provider, provider.as_str()),
		FilterTree::terms(Field::AlbumId, albums.iter()),
	])
}
