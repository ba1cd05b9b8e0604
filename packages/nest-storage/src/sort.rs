use std::cmp::Ordering;

use nest_domain::{Resource, SortDirection, SortKey};

/// Orders documents by `keys`. Missing sort values go last in either direction and `id`
/// breaks any remaining tie.
pub fn compare(lhs: &Resource, rhs: &Resource, keys: &[SortKey]) -> Ordering {
	for key in keys {
		let ordering = match (lhs.sort_value(key.field), rhs.sort_value(key.field)) {
			(Some(lhs), Some(rhs)) => {
				let ordering = lhs.compare(&rhs).unwrap_or(Ordering::Equal);

				match key.direction {
					SortDirection::Asc => ordering,
					SortDirection::Desc => ordering.reverse(),
				}
			},
			(Some(_), None) => Ordering::Less,
			(None, Some(_)) => Ordering::Greater,
			(None, None) => Ordering::Equal,
		};

		if ordering != Ordering::Equal {
			return ordering;
		}
	}

	lhs.id.cmp(&rhs.id)
}

pub fn sort_documents(documents: &mut [Resource], keys: &[SortKey]) {
	documents.sort_by(|lhs, rhs| compare(lhs, rhs, keys));
}

/// The `[from, from + size)` slice of already sorted documents.
pub fn window(documents: Vec<Resource>, from: u64, size: u32) -> Vec<Resource> {
	let from = usize::try_from(from).unwrap_or(usize::MAX);

	documents.into_iter().skip(from).take(size as usize).collect()
}
