use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::{Album, Resource};

/// An incoming, possibly partial, view of a resource from an ingestion source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
	pub resource: Resource,
	/// When set, `resource.albums` lists albums the resource has left.
	pub remove_albums: bool,
}
impl Observation {
	pub fn add(resource: Resource) -> Self {
		Self { resource, remove_albums: false }
	}

	pub fn remove(resource: Resource) -> Self {
		Self { resource, remove_albums: true }
	}
}
impl From<Resource> for Observation {
	fn from(resource: Resource) -> Self {
		Self::add(resource)
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciled {
	pub resource: Resource,
	/// Albums this observation added to the stored document.
	pub new_albums: Vec<Album>,
	/// Whether the merged document differs from the stored one in a tracked field.
	pub changed: bool,
}

/// Merges `incoming` into `existing` and decides whether a write is needed.
///
/// Only `tags`, `nests`, `people`, album ids and `removed` are tracked; drift in any other
/// field does not mark the document as changed.
pub fn reconcile(
	incoming: Observation,
	existing: Option<&Resource>,
	now: OffsetDateTime,
) -> Reconciled {
	let Observation { resource: mut merged, remove_albums } = incoming;

	merged.assign_id();
	merged.album = None;
	merged.updated_at = Some(now);

	let Some(existing) = existing else {
		merged.created_at.get_or_insert(now);

		if remove_albums {
			merged.albums.clear();
			merged.removed = true;

			return Reconciled { resource: merged, new_albums: Vec::new(), changed: true };
		}

		let new_albums = dedup_albums(std::mem::take(&mut merged.albums));

		merged.albums = new_albums.clone();

		return Reconciled { resource: merged, new_albums, changed: true };
	};

	merged.created_at = existing.created_at.or(merged.created_at).or(Some(now));
	merged.uploaded_at = existing.uploaded_at.or(merged.uploaded_at);
	merged.taken_at = existing.taken_at.or(merged.taken_at);
	merged.version = existing.version;
	merged.nests.extend(existing.nests.iter().copied());

	let new_albums = if remove_albums {
		let leaving = album_ids(&merged.albums);

		merged.albums = existing
			.albums
			.iter()
			.filter(|album| !leaving.contains(album.id.as_str()))
			.cloned()
			.collect();

		if merged.albums.is_empty() {
			merged.removed = true;
		}

		Vec::new()
	} else {
		let known = album_ids(&existing.albums);
		let new_albums: Vec<Album> = dedup_albums(std::mem::take(&mut merged.albums))
			.into_iter()
			.filter(|album| !known.contains(album.id.as_str()))
			.collect();

		merged.albums = existing.albums.iter().chain(new_albums.iter()).cloned().collect();

		if !new_albums.is_empty() {
			merged.removed = false;
		}

		new_albums
	};
	let changed = existing.tags != merged.tags
		|| existing.nests != merged.nests
		|| existing.people != merged.people
		|| album_ids(&existing.albums) != album_ids(&merged.albums)
		|| existing.removed != merged.removed;

	Reconciled { resource: merged, new_albums, changed }
}

fn album_ids(albums: &[Album]) -> BTreeSet<&str> {
	albums.iter().map(|album| album.id.as_str()).collect()
}

fn dedup_albums(albums: Vec<Album>) -> Vec<Album> {
	let mut seen = BTreeSet::new();

	albums.into_iter().filter(|album| seen.insert(album.id.clone())).collect()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use crate::{
		Album, Person, Resource,
		reconcile::{Observation, reconcile},
	};

	fn observed() -> Resource {
		Resource {
			title: Some("Purple sunset".to_string()),
			albums: vec![Album::new("2", "two")],
			people: vec![Person::new("22", "Rickey Henderson")],
			uploaded_at: Some(datetime!(2013-01-01 00:02:14 UTC)),
			..Resource::new("facebook", 1, "123456")
		}
	}

	#[test]
	fn first_write_always_persists() {
		let now = datetime!(2013-03-01 00:00:00 UTC);
		let mut incoming = observed();

		incoming.id = "caller-supplied".to_string();

		let out = reconcile(Observation::add(incoming), None, now);

		assert!(out.changed);
		assert_eq!(out.resource.id, Resource::new("facebook", 1, "123456").id);
		assert_eq!(out.new_albums, vec![Album::new("2", "two")]);
		assert_eq!(out.resource.created_at, Some(now));
		assert_eq!(out.resource.updated_at, Some(now));
	}

	#[test]
	fn reconciling_the_same_observation_twice_is_a_no_op() {
		let first = reconcile(observed().into(), None, datetime!(2013-03-01 00:00:00 UTC));
		let second = reconcile(
			observed().into(),
			Some(&first.resource),
			datetime!(2013-03-02 00:00:00 UTC),
		);

		assert!(!second.changed);
		assert!(second.new_albums.is_empty());
		assert_eq!(second.resource.updated_at, Some(datetime!(2013-03-02 00:00:00 UTC)));
	}

	#[test]
	fn timestamps_are_sticky() {
		let existing = reconcile(observed().into(), None, datetime!(2013-03-01 00:00:00 UTC));
		let mut later = observed();

		later.uploaded_at = Some(datetime!(2014-01-01 00:00:00 UTC));
		later.taken_at = Some(datetime!(2014-01-01 00:00:00 UTC));
		later.created_at = Some(datetime!(2014-01-01 00:00:00 UTC));

		let out =
			reconcile(later.into(), Some(&existing.resource), datetime!(2014-02-01 00:00:00 UTC));

		assert_eq!(out.resource.uploaded_at, Some(datetime!(2013-01-01 00:02:14 UTC)));
		assert_eq!(out.resource.created_at, Some(datetime!(2013-03-01 00:00:00 UTC)));
		assert_eq!(out.resource.taken_at, Some(datetime!(2014-01-01 00:00:00 UTC)));
	}

	#[test]
	fn untracked_field_drift_is_ignored() {
		let existing = reconcile(observed().into(), None, datetime!(2013-03-01 00:00:00 UTC));
		let mut retitled = observed();

		retitled.title = Some("booya!".to_string());

		let at = datetime!(2013-03-02 00:00:00 UTC);
		let out = reconcile(retitled.into(), Some(&existing.resource), at);

		assert!(!out.changed);

		let mut tagged = observed();

		tagged.tags.insert("danger".to_string());
		tagged.removed = true;

		let out =
			reconcile(tagged.into(), Some(&existing.resource), datetime!(2013-03-02 00:00:00 UTC));

		assert!(out.changed);
		assert!(out.resource.removed);
	}

	#[test]
	fn nests_are_unioned() {
		let mut first = observed();

		first.nests.insert(7);

		let existing = reconcile(first.into(), None, datetime!(2013-03-01 00:00:00 UTC));
		let mut second = observed();

		second.nests.insert(9);

		let out =
			reconcile(second.into(), Some(&existing.resource), datetime!(2013-03-02 00:00:00 UTC));

		assert!(out.changed);
		assert_eq!(out.resource.nests.iter().copied().collect::<Vec<_>>(), vec![7, 9]);
	}

	#[test]
	fn albums_can_be_added_and_removed_symmetrically() {
		let now = datetime!(2013-03-01 00:00:00 UTC);
		let mut stored = observed();

		stored.albums = vec![Album::new("1", "one")];

		let stored = reconcile(stored.into(), None, now).resource;
		let added = reconcile(observed().into(), Some(&stored), now);

		assert_eq!(added.new_albums.len(), 1);
		assert_eq!(added.resource.albums.len(), 2);

		let mut leave_two = observed();

		leave_two.albums = vec![Album::new("2", "two")];

		let removed_one =
			reconcile(Observation::remove(leave_two), Some(&added.resource), now);

		assert_eq!(removed_one.resource.albums, vec![Album::new("1", "one")]);
		assert!(!removed_one.resource.removed);

		let mut leave_one = observed();

		leave_one.albums = vec![Album::new("1", "one")];

		let emptied =
			reconcile(Observation::remove(leave_one.clone()), Some(&removed_one.resource), now);

		assert!(emptied.changed);
		assert!(emptied.resource.albums.is_empty());
		assert!(emptied.resource.removed);

		let readded = reconcile(Observation::add(leave_one), Some(&emptied.resource), now);

		assert!(readded.changed);
		assert_eq!(readded.new_albums, vec![Album::new("1", "one")]);
		assert!(!readded.resource.removed);
	}

	#[test]
	fn removal_without_a_stored_document_is_a_tombstone() {
		let out =
			reconcile(Observation::remove(observed()), None, datetime!(2013-03-01 00:00:00 UTC));

		assert!(out.changed);
		assert!(out.resource.albums.is_empty());
		assert!(out.resource.removed);
	}
}
