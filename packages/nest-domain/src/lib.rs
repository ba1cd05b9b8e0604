pub mod filter;
pub mod hashtag;
pub mod provider;
pub mod query;
pub mod reconcile;
pub mod resource;
pub mod timestamp;

mod error;

pub use error::{Error, Result};
pub use filter::{Field, FieldSource, FilterTree, FilterValue};
pub use hashtag::extract_hashtags;
pub use provider::{
	AlbumTagFilter, OwnerTags, Provider, ProviderSource, SourceSpec, Sources, TagFilter,
	build_provider_filter,
};
pub use query::{
	CursorAnchor, FetchOptions, PageCursor, PageWindow, SortDirection, SortField, SortKey,
	TimeBound, build_query_filter, sort_keys,
};
pub use reconcile::{Observation, Reconciled, reconcile};
pub use resource::{Album, Person, Resource, resource_id};
