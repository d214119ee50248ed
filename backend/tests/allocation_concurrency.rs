//! Concurrency behaviour of slug allocation against the in-memory store.
//!
//! The in-memory store mirrors the database constraint (atomic
//! check-and-write under one guard) while probe and commit acquire the lock
//! separately, so these tests exercise the real probe/commit race window.

use std::sync::Arc;

use futures::future::join_all;
use mockable::DefaultClock;
use serde_json::json;
use uuid::Uuid;

use backend::domain::{
    AllocateOptions, EntityDocument, EntityKind, EntityRules, SlugAllocationService, SlugRecord,
};
use backend::test_support::InMemoryDirectoryStore;

fn clinic(name: &str, address: &str) -> EntityDocument {
    EntityDocument::new(
        Uuid::new_v4(),
        EntityKind::Clinic,
        SlugRecord::vacant(),
        json!({ "name": name, "address": address, "is_approved": true }),
    )
}

fn service(
    store: Arc<InMemoryDirectoryStore>,
) -> Arc<SlugAllocationService<InMemoryDirectoryStore>> {
    Arc::new(SlugAllocationService::new(
        store,
        Arc::new(EntityRules::standard()),
        Arc::new(DefaultClock),
    ))
}

#[tokio::test]
async fn two_racing_entities_split_base_and_suffix() {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let first = clinic("Dr John Smith", "Deira, Dubai");
    let second = clinic("Dr John Smith", "Deira, Dubai");
    let ids = [first.id, second.id];
    store.insert_entity(first);
    store.insert_entity(second);

    let svc = service(Arc::clone(&store));
    let outcomes = join_all(ids.map(|id| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            svc.allocate_and_lock(EntityKind::Clinic, id, AllocateOptions::default())
                .await
        })
    }))
    .await;

    let mut slugs: Vec<String> = outcomes
        .into_iter()
        .map(|joined| {
            joined
                .expect("task completes")
                .expect("no caller sees a duplicate error")
                .slug()
                .expect("slug present")
                .to_owned()
        })
        .collect();
    slugs.sort();

    assert_eq!(slugs, vec!["dr-john-smith-deira", "dr-john-smith-deira-2"]);
    for id in ids {
        let doc = store.entity(EntityKind::Clinic, id).expect("entity kept");
        assert!(doc.slug.locked);
    }
}

#[tokio::test]
async fn concurrent_colliding_allocations_preserve_uniqueness() {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let names = [
        "City Dental Clinic",
        "City Dental Clinic",
        "City Dental Clinic",
        "City Dental Clinic",
        "Harley Medical Centre",
        "Harley Medical Centre",
        "Harley Medical Centre",
        "Dr John Smith",
        "Dr John Smith",
        "Dr John Smith",
        "Dr John Smith",
        "Dr John Smith",
    ];
    let ids: Vec<Uuid> = names
        .iter()
        .map(|name| {
            let doc = clinic(name, "Dubai Marina, Dubai");
            let id = doc.id;
            store.insert_entity(doc);
            id
        })
        .collect();

    let svc = service(Arc::clone(&store));
    let outcomes = join_all(ids.iter().copied().map(|id| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            svc.allocate_and_lock(EntityKind::Clinic, id, AllocateOptions::default())
                .await
        })
    }))
    .await;

    for joined in outcomes {
        joined
            .expect("task completes")
            .expect("every allocation converges without surfacing a race");
    }

    let locked = store.locked_slugs(EntityKind::Clinic);
    assert_eq!(locked.len(), names.len(), "every entity ends up locked");

    let mut deduped = locked.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), locked.len(), "locked slugs are unique: {locked:?}");

    for slug in &locked {
        assert!(
            backend::domain::validate_format(slug).is_ok(),
            "{slug:?} violates the format grammar"
        );
    }
}

#[tokio::test]
async fn duplicate_calls_for_one_entity_converge_on_a_single_slug() {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let doc = clinic("City Dental Clinic", "Jumeirah, Dubai");
    let id = doc.id;
    store.insert_entity(doc);

    let svc = service(Arc::clone(&store));
    let outcomes = join_all((0..8).map(|_| {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            svc.allocate_and_lock(EntityKind::Clinic, id, AllocateOptions::default())
                .await
        })
    }))
    .await;

    let mut slugs: Vec<String> = outcomes
        .into_iter()
        .map(|joined| {
            joined
                .expect("task completes")
                .expect("all callers observe a locked slug")
                .slug()
                .expect("slug present")
                .to_owned()
        })
        .collect();
    slugs.dedup();

    assert_eq!(
        slugs.len(),
        1,
        "all callers observe the same winning slug: {slugs:?}"
    );
    assert_eq!(store.locked_slugs(EntityKind::Clinic).len(), 1);
}

#[tokio::test]
async fn locked_slug_resolves_back_to_its_entity() {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let doc = clinic("City Dental Clinic", "Jumeirah, Dubai");
    let id = doc.id;
    store.insert_entity(doc);

    let svc = service(Arc::clone(&store));
    let outcome = svc
        .allocate_and_lock(EntityKind::Clinic, id, AllocateOptions::default())
        .await
        .expect("allocation succeeds");
    let slug = outcome.slug().expect("slug present").to_owned();

    let resolved = svc
        .find_by_locked_slug(EntityKind::Clinic, &slug)
        .await
        .expect("lookup succeeds")
        .expect("entity found");
    assert_eq!(resolved.id, id);
}

#[tokio::test]
async fn cross_record_join_allocates_through_the_store() {
    let store = Arc::new(InMemoryDirectoryStore::new());
    let account_id = Uuid::new_v4();
    store.insert_related(
        "accounts",
        account_id,
        json!({ "display_name": "Jane Smith", "is_approved": true }),
    );

    let doctor = EntityDocument::new(
        Uuid::new_v4(),
        EntityKind::Doctor,
        SlugRecord::vacant(),
        json!({
            "account": account_id.to_string(),
            "address": "Dubai Marina, Dubai",
        }),
    );
    let id = doctor.id;
    store.insert_entity(doctor);

    let svc = service(Arc::clone(&store));
    let outcome = svc
        .allocate_and_lock(EntityKind::Doctor, id, AllocateOptions::default())
        .await
        .expect("doctor allocation succeeds");

    assert_eq!(outcome.slug(), Some("dr-jane-smith-dubai-marina"));
}
