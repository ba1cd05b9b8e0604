use nest_domain::{Album, FetchOptions, Resource, SourceSpec, Sources};
use nest_service::{Error, NestService, ReindexReport};
use nest_storage::{MemoryIndex, SearchIndex};
use nest_testkit::{find, resources, seeded_index, test_config};

fn legacy(mut resource: Resource) -> Resource {
	resource.album = resource.albums.pop();

	resource
}

#[tokio::test]
async fn reindex_copies_every_document_and_migrates_legacy_albums() {
	let mut documents = resources();

	documents[0] = legacy(documents[0].clone());
	documents[1].removed = true;
	documents[2].height = Some(640);
	documents[2].html = Some("<img src=\"3.jpg\">".to_string());

	let sized_id = documents[2].id.clone();

	let source = MemoryIndex::new("resources_v1");
	let target = seeded_index(Vec::new());
	let service = NestService::new(test_config(), target.clone());

	source.seed(documents);

	let report =
		service.reindex(&source, target.as_ref(), Some(3)).await.expect("reindex succeeds");

	assert_eq!(report, ReindexReport { scanned: 8, written: 8, migrated_albums: 1 });
	assert_eq!(target.len(), 8);
	assert_eq!(target.refresh_count(), 1);

	let migrated = target
		.get_by_ids(&[find(&resources(), "facebook", 1).id])
		.await
		.expect("lookup succeeds")
		.pop()
		.expect("migrated document exists");

	assert_eq!(migrated.albums, vec![Album::new("1", "Album 1")]);
	assert_eq!(migrated.album, None);

	let sized = target
		.get_by_ids(&[sized_id])
		.await
		.expect("lookup succeeds")
		.pop()
		.expect("copied document exists");

	assert_eq!(sized.height, Some(640));
	assert_eq!(sized.html.as_deref(), Some("<img src=\"3.jpg\">"));

	let nest: Sources = [("facebook".to_string(), SourceSpec::albums(["1"]))].into_iter().collect();

	assert_eq!(service.count(&nest, &FetchOptions::default()).await.expect("count succeeds"), 1);
}

#[tokio::test]
async fn reindex_of_an_empty_index_only_refreshes() {
	let source = MemoryIndex::new("resources_v1");
	let target = seeded_index(Vec::new());
	let service = NestService::new(test_config(), target.clone());
	let report = service.reindex(&source, target.as_ref(), None).await.expect("reindex succeeds");

	assert_eq!(report, ReindexReport::default());
	assert_eq!(target.refresh_count(), 1);
}

#[tokio::test]
async fn reindex_rejects_a_self_copy_and_zero_batches() {
	let index = seeded_index(resources());
	let other = MemoryIndex::new("resources_v2");
	let service = NestService::new(test_config(), index.clone());

	assert!(matches!(
		service.reindex(index.as_ref(), index.as_ref(), None).await,
		Err(Error::InvalidArgument { .. })
	));
	assert!(matches!(
		service.reindex(index.as_ref(), &other, Some(0)).await,
		Err(Error::InvalidArgument { .. })
	));
	assert!(other.is_empty());
}

#[tokio::test]
async fn reindex_resumes_after_the_last_copied_external_id() {
	let source = MemoryIndex::new("resources_v1");
	let target = seeded_index(Vec::new());
	let service = NestService::new(test_config(), target.clone());

	source.seed(resources());

	let report =
		service.reindex(&source, target.as_ref(), Some(4)).await.expect("reindex succeeds");

	assert_eq!(report.scanned, 8);
	assert_eq!(target.len(), 8);
	// Two full batches and one empty batch past the highest external_id.
	assert_eq!(source.query_count(), 3);
}
