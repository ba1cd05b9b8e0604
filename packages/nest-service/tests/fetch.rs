use std::{collections::HashSet, sync::Arc};

use nest_domain::{FetchOptions, Resource, SortDirection, SortField, SourceSpec, Sources};
use nest_service::{Error, NestService};
use nest_storage::{MemoryIndex, TermBucket};
use nest_testkit::{
	FACEBOOK_OWNER, INSTAGRAM_OTHER_OWNER, INSTAGRAM_OWNER, PAGING_OWNER, PAGING_TAG, find,
	ordered_resources, resources, seeded_index, test_config,
};

fn service_over(documents: Vec<Resource>) -> (NestService, Arc<MemoryIndex>) {
	let index = seeded_index(documents);

	(NestService::new(test_config(), index.clone()), index)
}

fn service() -> (NestService, Arc<MemoryIndex>) {
	service_over(resources())
}

fn sources(entries: Vec<(&str, SourceSpec)>) -> Sources {
	entries.into_iter().map(|(provider, spec)| (provider.to_string(), spec)).collect()
}

fn albums(ids: &[&str]) -> Sources {
	sources(vec![("facebook", SourceSpec::albums(ids.iter().copied()))])
}

fn every_source() -> Sources {
	sources(vec![
		("facebook", SourceSpec::albums(["1", "2"])),
		(
			"instagram",
			SourceSpec::tags(INSTAGRAM_OWNER, ["california"])
				.with_owner(INSTAGRAM_OTHER_OWNER, ["california", "norcal"]),
		),
	])
}

fn ids(documents: &[Resource]) -> Vec<String> {
	documents.iter().map(|doc| doc.id.clone()).collect()
}

fn bucket(key: &str, count: u64) -> TermBucket {
	TermBucket { key: key.to_string(), count }
}

#[tokio::test]
async fn single_album_matches_its_resources() {
	let (service, _) = service();
	let nest = albums(&["1"]);
	let page = service.fetch(&nest, &FetchOptions::default()).await.expect("fetch succeeds");

	assert_eq!(service.count(&nest, &FetchOptions::default()).await.expect("count succeeds"), 2);
	assert_eq!(page.total, 2);
	assert!(page.items.iter().all(|doc| doc.album_ids().any(|id| id == "1")));
}

#[tokio::test]
async fn two_album_pages_do_not_overlap() {
	let (service, _) = service();
	let nest = albums(&["1", "2"]);
	let first = service
		.fetch(&nest, &FetchOptions::default().paged(1, 2))
		.await
		.expect("first page succeeds");
	let second = service
		.fetch(&nest, &FetchOptions::default().paged(2, 2))
		.await
		.expect("second page succeeds");
	let seen = ids(&first.items).into_iter().chain(ids(&second.items)).collect::<HashSet<_>>();

	assert_eq!(first.items.len(), 2);
	assert_eq!(second.items.len(), 2);
	assert_eq!(seen.len(), 4);
	assert_eq!(first.total, 4);
}

#[tokio::test]
async fn instagram_tags_match_per_owner() {
	let (service, _) = service();
	let opts = FetchOptions::default();
	let one_tag =
		sources(vec![("instagram", SourceSpec::tags(INSTAGRAM_OTHER_OWNER, ["california"]))]);
	let two_tags = sources(vec![(
		"instagram",
		SourceSpec::tags(INSTAGRAM_OTHER_OWNER, ["california", "norcal"]),
	)]);
	let two_owners = sources(vec![(
		"instagram",
		SourceSpec::tags(INSTAGRAM_OWNER, ["california"])
			.with_owner(INSTAGRAM_OTHER_OWNER, ["california", "norcal"]),
	)]);

	assert_eq!(service.count(&one_tag, &opts).await.expect("count succeeds"), 2);
	assert_eq!(service.count(&two_tags, &opts).await.expect("count succeeds"), 3);
	assert_eq!(service.count(&two_owners, &opts).await.expect("count succeeds"), 4);

	let page = service.fetch(&one_tag, &opts).await.expect("fetch succeeds");

	assert!(page.items.iter().all(|doc| {
		doc.provider == "instagram"
			&& doc.owner_uid == INSTAGRAM_OTHER_OWNER
			&& doc.tags.contains("california")
			&& !doc.removed
	}));
}

#[tokio::test]
async fn providers_combine_and_paginate() {
	let (service, _) = service();
	let nest = every_source();
	let first = service
		.fetch(&nest, &FetchOptions::default().paged(1, 5))
		.await
		.expect("first page succeeds");
	let second = service
		.fetch(&nest, &FetchOptions::default().paged(2, 5))
		.await
		.expect("second page succeeds");

	assert_eq!(first.total, 8);
	assert_eq!(first.items.len(), 5);
	assert_eq!(second.items.len(), 3);
	assert_eq!(second.page, 2);
	assert_eq!(second.page_size, 5);
}

#[tokio::test]
async fn ascending_is_the_mirror_of_descending() {
	let (service, _) = service();
	let nest = every_source();
	let desc = service
		.fetch(&nest, &FetchOptions::default().sorted(SortField::UploadedAt, SortDirection::Desc))
		.await
		.expect("desc fetch succeeds");
	let asc = service
		.fetch(&nest, &FetchOptions::default().sorted(SortField::UploadedAt, SortDirection::Asc))
		.await
		.expect("asc fetch succeeds");
	let mut reversed = ids(&asc.items);

	reversed.reverse();

	assert_eq!(desc.items.len(), 8);
	assert_eq!(reversed, ids(&desc.items));
	assert_eq!(desc.items[0], find(&resources(), "facebook", 4));
}

#[tokio::test]
async fn time_bounds_are_exclusive() {
	let (service, _) = service();
	let nest = every_source();
	let cases = [
		(FetchOptions::default().until("2011-01-01"), 0),
		(FetchOptions::default().since("2011-01-01"), 8),
		(FetchOptions::default().since("2013-01-01"), 5),
		(FetchOptions::default().until("2012-12-31 23:59:59"), 3),
		(FetchOptions::default().since("2012-11-15 00:00:00").until("2012-11-15 23:59:59"), 2),
		(FetchOptions::default().since("2013-01-01T00:02:14Z"), 4),
	];

	for (opts, expected) in cases {
		let count = service.count(&nest, &opts).await.expect("count succeeds");

		assert_eq!(count, expected, "{opts:?}");
	}
}

#[tokio::test]
async fn narrowing_the_window_yields_subsets() {
	let (service, _) = service();
	let nest = every_source();
	let windows = [
		FetchOptions::default().since("2012-01-01"),
		FetchOptions::default().since("2012-11-15"),
		FetchOptions::default().since("2012-11-15").until("2013-01-15"),
		FetchOptions::default().since("2012-12-01").until("2013-01-15"),
		FetchOptions::default().since("2012-12-01").until("2013-01-02"),
	];
	let mut previous: Option<HashSet<String>> = None;

	for opts in windows {
		let page = service.fetch(&nest, &opts).await.expect("fetch succeeds");
		let current = ids(&page.items).into_iter().collect::<HashSet<_>>();

		if let Some(previous) = &previous {
			assert!(current.is_subset(previous), "{opts:?}");
		}

		previous = Some(current);
	}
}

#[tokio::test]
async fn malformed_bounds_fail_before_any_query() {
	let (service, index) = service();
	let nest = every_source();
	let result = service.fetch(&nest, &FetchOptions::default().since("1234")).await;

	assert!(matches!(result, Err(Error::InvalidArgument { .. })));
	assert!(matches!(
		service.count(&nest, &FetchOptions::default().until("yesterday")).await,
		Err(Error::InvalidArgument { .. })
	));
	assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn invalid_specifications_fail_before_any_query() {
	let (service, index) = service();
	let unknown = sources(vec![("flickr", SourceSpec::albums(["1"]))]);
	let empty_facebook = sources(vec![("facebook", SourceSpec::default())]);
	let tagless_instagram = sources(vec![("instagram", SourceSpec::albums(["1"]))]);

	for nest in [unknown, empty_facebook, tagless_instagram] {
		let result = service.fetch(&nest, &FetchOptions::default()).await;

		assert!(matches!(result, Err(Error::InvalidSpecification { .. })), "{nest:?}");
	}

	assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn page_window_is_validated() {
	let (service, index) = service();
	let nest = every_source();

	for opts in [
		FetchOptions::default().paged(0, 5),
		FetchOptions::default().paged(1, 0),
		FetchOptions::default().paged(1, 101),
	] {
		let result = service.fetch(&nest, &opts).await;

		assert!(matches!(result, Err(Error::InvalidArgument { .. })), "{opts:?}");
	}

	assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn empty_sources_match_nothing_without_a_query() {
	let (service, index) = service();
	let nest = Sources::new();
	let page = service.fetch(&nest, &FetchOptions::default()).await.expect("fetch succeeds");

	assert!(page.items.is_empty());
	assert_eq!(page.next_cursor, None);
	assert_eq!(service.count(&nest, &FetchOptions::default()).await.expect("count succeeds"), 0);
	assert!(
		service
			.find_tagged_people(&nest, &FetchOptions::default())
			.await
			.expect("facet succeeds")
			.is_empty()
	);
	assert_eq!(index.query_count(), 0);
}

#[tokio::test]
async fn excluded_ids_are_left_out() {
	let (service, _) = service();
	let nest = every_source();
	let fixtures = resources();
	let facebook_one = find(&fixtures, "facebook", 1);
	let instagram_three = find(&fixtures, "instagram", 103);
	let opts = FetchOptions::default().excluding([facebook_one.id.clone()]);
	let page = service.fetch(&nest, &opts).await.expect("fetch succeeds");

	assert_eq!(page.total, 7);
	assert!(page.items.iter().all(|doc| doc.id != facebook_one.id));

	let opts = opts.excluding([instagram_three.id.clone()]);

	assert_eq!(service.count(&nest, &opts).await.expect("count succeeds"), 6);
}

#[tokio::test]
async fn removed_resources_are_invisible() {
	let mut fixtures = resources();

	fixtures[0].removed = true;

	let removed_id = fixtures[0].id.clone();
	let (service, _) = service_over(fixtures);
	let nest = every_source();

	assert_eq!(service.count(&nest, &FetchOptions::default()).await.expect("count succeeds"), 7);
	assert!(!service.includes(&nest, &removed_id).await.expect("includes succeeds"));
}

#[tokio::test]
async fn membership_checks_ignore_paging_and_bounds() {
	let (service, _) = service();
	let fixtures = resources();
	let nest = albums(&["1"]);

	assert!(
		service
			.includes(&nest, &find(&fixtures, "facebook", 1).id)
			.await
			.expect("includes succeeds")
	);
	assert!(
		!service
			.includes(&nest, &find(&fixtures, "facebook", 3).id)
			.await
			.expect("includes succeeds")
	);
	assert!(!service.includes(&nest, "unknown").await.expect("includes succeeds"));
}

#[tokio::test]
async fn fetch_ids_filters_by_owner() {
	let (service, _) = service();
	let fixtures = resources();
	let wanted = vec![
		find(&fixtures, "facebook", 1).id,
		find(&fixtures, "facebook", 4).id,
		find(&fixtures, "instagram", 102).id,
	];
	let owners = vec![FACEBOOK_OWNER.to_string()];
	let owned = service.fetch_ids(&wanted, Some(&owners)).await.expect("fetch succeeds");
	let all = service.fetch_ids(&wanted, None).await.expect("fetch succeeds");

	assert_eq!(owned.len(), 2);
	assert!(owned.iter().all(|doc| doc.owner_uid == FACEBOOK_OWNER));
	assert_eq!(all.len(), 3);
	assert!(service.fetch_ids(&[], None).await.expect("fetch succeeds").is_empty());
}

#[tokio::test]
async fn tagged_people_are_counted_per_document() {
	let (service, _) = service();
	let people = service
		.find_tagged_people(&albums(&["1", "2"]), &FetchOptions::default())
		.await
		.expect("facet succeeds");

	assert_eq!(people.len(), 4);
	assert_eq!(people[0], bucket("22", 3));
	assert_eq!(people[1], bucket("42", 2));
}

#[tokio::test]
async fn user_tags_are_ranked_by_count() {
	let (service, _) = service();
	let tags = service.find_user_tags(INSTAGRAM_OTHER_OWNER).await.expect("facet succeeds");

	assert_eq!(tags, vec![bucket("california", 2), bucket("norcal", 1)]);
	assert!(matches!(service.find_user_tags("  ").await, Err(Error::InvalidArgument { .. })));
}

#[tokio::test]
async fn backend_errors_surface_unchanged() {
	let (service, index) = service();

	index.set_unavailable(true);

	let result = service.fetch(&every_source(), &FetchOptions::default()).await;

	assert!(matches!(result, Err(Error::Index(nest_storage::Error::Unavailable(_)))));
}

async fn drain(service: &NestService, nest: &Sources, opts: FetchOptions) -> Vec<String> {
	let mut collected = Vec::new();
	let mut opts = opts;

	for _ in 0..20 {
		let page = service.fetch(nest, &opts).await.expect("page succeeds");

		if page.items.is_empty() {
			return collected;
		}

		collected.extend(ids(&page.items));

		let Some(cursor) = page.next_cursor else {
			return collected;
		};

		opts = opts.after(&cursor);
	}

	panic!("Cursor paging did not terminate.");
}

#[tokio::test]
async fn cursor_paging_is_complete_with_duplicate_timestamps() {
	let (service, _) = service_over(ordered_resources());
	let nest = sources(vec![("instagram", SourceSpec::tags(PAGING_OWNER, [PAGING_TAG]))]);

	for direction in [SortDirection::Desc, SortDirection::Asc] {
		let opts = FetchOptions::default().sorted(SortField::UploadedAt, direction);
		let full = service.fetch(&nest, &opts).await.expect("full fetch succeeds");
		let paged = drain(&service, &nest, opts.clone().paged(1, 2)).await;

		assert_eq!(full.items.len(), 7);
		assert_eq!(paged, ids(&full.items), "{direction:?}");
	}
}

#[tokio::test]
async fn cursor_paging_by_external_id_is_complete() {
	let (service, _) = service();
	let nest = every_source();
	let opts = FetchOptions::default().sorted(SortField::ExternalId, SortDirection::Desc);
	let full = service.fetch(&nest, &opts).await.expect("full fetch succeeds");
	let paged = drain(&service, &nest, opts.clone().paged(1, 3)).await;

	assert_eq!(paged, ids(&full.items));
}

#[tokio::test]
async fn cursor_paging_reaches_documents_without_an_upload_time() {
	let mut documents = ordered_resources();
	let template = documents[0].clone();

	for external_id in [301, 302, 303] {
		let mut undated = Resource { external_id, uploaded_at: None, ..template.clone() };

		undated.assign_id();
		documents.push(undated);
	}

	let (service, _) = service_over(documents);
	let nest = sources(vec![("instagram", SourceSpec::tags(PAGING_OWNER, [PAGING_TAG]))]);

	for direction in [SortDirection::Desc, SortDirection::Asc] {
		let opts = FetchOptions::default().sorted(SortField::UploadedAt, direction);
		let full = service.fetch(&nest, &opts).await.expect("full fetch succeeds");

		assert_eq!(full.items.len(), 10);
		assert!(full.items[7..].iter().all(|doc| doc.uploaded_at.is_none()), "{direction:?}");

		for page_size in [1, 2, 3] {
			let paged = drain(&service, &nest, opts.clone().paged(1, page_size)).await;

			assert_eq!(paged, ids(&full.items), "{direction:?} by {page_size}");
		}
	}
}

#[tokio::test]
async fn cursors_on_unreachable_sort_fields_fail_before_any_query() {
	let (service, index) = service();
	let nest = every_source();
	let opts = FetchOptions::default().sorted(SortField::TakenAt, SortDirection::Desc);
	let first = service.fetch(&nest, &opts).await.expect("offset paging by taken_at succeeds");
	let queries = index.query_count();
	let next = opts.after(&first.next_cursor.expect("first page is not empty"));

	assert!(matches!(service.fetch(&nest, &next).await, Err(Error::InvalidArgument { .. })));
	assert_eq!(index.query_count(), queries);
}
