//! End-to-end object lifecycle scenarios: names, drafts, documents,
//! contracts, and the immutable-object caches.

use std::collections::BTreeMap;
use std::sync::Arc;

use nebula_repository::{
    DocumentRepository, ErrorKind, FacadeError, InMemoryDriver, LocalDriver, Notary, OpContext,
    SoftwareNotary, StorageFacade,
};
use nebula_repository_test_utils::{TestDir, content};
use nebula_repository_types::{Citation, Name};
use serde_json::Value;

fn notary() -> Arc<SoftwareNotary> {
    Arc::new(SoftwareNotary::from_seed([42u8; 32]))
}

fn repository() -> DocumentRepository<InMemoryDriver> {
    DocumentRepository::new(InMemoryDriver::new(), notary())
}

fn facade() -> StorageFacade<InMemoryDriver> {
    StorageFacade::new(InMemoryDriver::new(), notary())
}

/// A valid citation for name-binding tests.
fn some_citation(notary: &dyn Notary) -> Citation {
    let document = notary.notarize(content::text_content("cited")).expect("notarize");
    notary.cite(&document).expect("cite")
}

#[tokio::test]
async fn citation_lifecycle() {
    let facade = facade();
    let ctx = OpContext::new();
    let name = Name::new("/examples/name/v1.2.3").expect("name");
    let citation = some_citation(facade.notary().as_ref());

    assert!(!facade.name_exists(&ctx, &name).await.expect("exists"));
    facade.write_name(&ctx, &name, &citation).await.expect("bind");
    assert!(facade.name_exists(&ctx, &name).await.expect("exists"));
    assert_eq!(facade.read_name(&ctx, &name).await.expect("read"), Some(citation.clone()));

    // A name binds exactly once, even to the same citation.
    let err = facade.write_name(&ctx, &name, &citation).await.expect_err("rebind");
    assert!(matches!(err, FacadeError::NameExists { .. }));
    assert_eq!(facade.read_name(&ctx, &name).await.expect("read"), Some(citation));
}

#[tokio::test]
async fn name_reads_hit_the_cache() {
    let facade = facade();
    let ctx = OpContext::new();
    let name = Name::new("/cached/name/v1").expect("name");
    let citation = some_citation(facade.notary().as_ref());

    facade.write_name(&ctx, &name, &citation).await.expect("bind");
    let reads_before = facade.driver().read_count();

    // Write-through population: both reads are cache hits.
    assert_eq!(facade.read_name(&ctx, &name).await.expect("read"), Some(citation.clone()));
    assert_eq!(facade.read_name(&ctx, &name).await.expect("read"), Some(citation));
    assert_eq!(facade.driver().read_count(), reads_before);

    // Existence checks also stop at the cache.
    let exists_before = facade.driver().exists_count();
    assert!(facade.name_exists(&ctx, &name).await.expect("exists"));
    assert_eq!(facade.driver().exists_count(), exists_before);
}

#[tokio::test]
async fn draft_lifecycle() {
    let repository = repository();
    let ctx = OpContext::new();

    let draft = content::text_content("work in progress");
    let citation = repository.save_document(&ctx, draft.clone()).await.expect("save");

    let facade = repository.facade();
    assert!(facade.draft_exists(&ctx, &citation).await.expect("draft exists"));
    assert!(!facade.document_exists(&ctx, &citation).await.expect("document exists"));

    let retrieved = repository.retrieve_document(&ctx, &citation).await.expect("retrieve");
    assert_eq!(retrieved, Some(draft.clone()));

    // Drafts are freely overwritten; the key ignores content changes.
    let edited = draft.with_attribute("$text", "edited");
    let edited_citation = repository.save_document(&ctx, edited.clone()).await.expect("resave");
    assert_eq!(
        repository.retrieve_document(&ctx, &edited_citation).await.expect("retrieve"),
        Some(edited)
    );

    assert!(repository.discard_document(&ctx, &citation).await.expect("discard"));
    assert!(!facade.draft_exists(&ctx, &citation).await.expect("draft exists"));
    assert_eq!(repository.retrieve_document(&ctx, &citation).await.expect("retrieve"), None);
    // Discarding again is a no-op.
    assert!(!repository.discard_document(&ctx, &citation).await.expect("discard"));
}

#[tokio::test]
async fn commit_supersedes_draft_and_binds_name() {
    let repository = repository();
    let ctx = OpContext::new();
    let name = Name::new("/examples/committed/v3.4").expect("name");

    let draft = content::text_content("to be committed");
    let draft_citation = repository.save_document(&ctx, draft.clone()).await.expect("save");

    let citation = repository.commit_document(&ctx, &name, draft.clone()).await.expect("commit");
    assert_eq!(citation, draft_citation);

    let facade = repository.facade();
    assert!(!facade.draft_exists(&ctx, &citation).await.expect("draft gone"));
    assert!(facade.document_exists(&ctx, &citation).await.expect("document exists"));

    let resolved = repository.retrieve_name(&ctx, &name).await.expect("resolve");
    assert_eq!(resolved.map(|document| document.content), Some(draft));

    // The name is now taken.
    let err = repository
        .commit_document(&ctx, &name, content::text_content("other"))
        .await
        .expect_err("name taken");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn non_idempotent_document_rewrite_is_rejected() {
    let facade = facade();
    let ctx = OpContext::new();
    let notary = Arc::clone(facade.notary());

    let original = content::text_content("original");
    let document = notary.notarize(original.clone()).expect("notarize");
    let citation = facade.write_document(&ctx, &document).await.expect("write");

    // Byte-identical re-upload is a retry, not an error.
    assert_eq!(facade.write_document(&ctx, &document).await.expect("rewrite"), citation);

    // Different bytes under the same (tag, version) are refused.
    let mutated = notary
        .notarize(original.with_attribute("$text", "mutated"))
        .expect("notarize");
    let err = facade.write_document(&ctx, &mutated).await.expect_err("conflict");
    assert!(matches!(err, FacadeError::DocumentExists { .. }));

    // The original is untouched.
    assert_eq!(facade.read_document(&ctx, &citation).await.expect("read"), Some(document));
}

#[tokio::test]
async fn contract_promotion_removes_the_staging_document() {
    let facade = facade();
    let ctx = OpContext::new();
    let notary = Arc::clone(facade.notary());

    let document = notary.notarize(content::text_content("to promote")).expect("notarize");
    let citation = facade.write_document(&ctx, &document).await.expect("write");
    assert_eq!(facade.read_document(&ctx, &citation).await.expect("read"), Some(document.clone()));

    let promoted = facade.write_contract(&ctx, &document).await.expect("promote");
    assert_eq!(promoted, citation);

    // The contract took the document's place, including in the caches.
    assert_eq!(facade.read_contract(&ctx, &citation).await.expect("read"), Some(document.clone()));
    assert_eq!(facade.read_document(&ctx, &citation).await.expect("read"), None);
    assert!(!facade.document_exists(&ctx, &citation).await.expect("exists"));

    // Promotion happens exactly once.
    let err = facade.write_contract(&ctx, &document).await.expect_err("re-promote");
    assert!(matches!(err, FacadeError::ContractExists { .. }));

    // Writing a document under a promoted key is refused.
    let err = facade.write_document(&ctx, &document).await.expect_err("shadow");
    assert!(matches!(err, FacadeError::ContractExists { .. }));
}

#[tokio::test]
async fn create_document_merges_type_defaults() {
    let repository = repository();
    let ctx = OpContext::new();
    let type_name = Name::new("/nebula/types/Memo/v1").expect("name");

    let type_content = content::text_content("")
        .with_attribute("$style", "formal")
        .with_attribute("$text", "(fill in)");
    repository.commit_document(&ctx, &type_name, type_content).await.expect("commit type");

    let mut template = BTreeMap::new();
    template.insert("$text".to_string(), Value::from("hello"));
    let draft = repository
        .create_document(&ctx, &type_name, &content::public_permissions(), template)
        .await
        .expect("create");

    // Template overrides the type default; untouched defaults survive.
    assert_eq!(draft.attribute("$text").and_then(Value::as_str), Some("hello"));
    assert_eq!(draft.attribute("$style").and_then(Value::as_str), Some("formal"));
    assert_eq!(draft.type_name.as_ref(), Some(&type_name));

    // An uncommitted type is unknown.
    let missing = Name::new("/nebula/types/Missing/v1").expect("name");
    let err = repository
        .create_document(&ctx, &missing, &content::public_permissions(), BTreeMap::new())
        .await
        .expect_err("unknown type");
    assert_eq!(err.kind(), ErrorKind::UnknownType);
}

#[tokio::test]
async fn lifecycle_over_the_local_filesystem() {
    // The same protocol holds over the filesystem driver.
    let dir = TestDir::new();
    let repository =
        DocumentRepository::new(LocalDriver::new(dir.join("repository")), notary());
    let ctx = OpContext::new();
    let name = Name::new("/examples/local/v1").expect("name");

    let draft = content::text_content("on disk");
    let citation = repository.save_document(&ctx, draft.clone()).await.expect("save");
    assert_eq!(
        repository.retrieve_document(&ctx, &citation).await.expect("retrieve"),
        Some(draft.clone())
    );

    let committed = repository.commit_document(&ctx, &name, draft.clone()).await.expect("commit");
    assert_eq!(committed, citation);
    assert!(dir.join("repository/names").is_dir());
    assert!(dir.join("repository/documents").is_dir());

    let resolved = repository.retrieve_name(&ctx, &name).await.expect("resolve");
    assert_eq!(resolved.map(|document| document.content), Some(draft));

    let err = repository
        .commit_document(&ctx, &name, content::text_content("other"))
        .await
        .expect_err("name taken");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}
