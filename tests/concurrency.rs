mod common;

use common::{connection, MemoryStore};

use tripod::composite::Value;
use tripod::entity::Entity;
use tripod::error::TripodError;
use tripod::identifier::QName;
use tripod::literal::Literal;

fn q(name: &str) -> QName {
    QName::parse(name).unwrap()
}

const FOREIGN_STAMP: &str = "\"2030-01-01T00:00:00Z\"^^xsd:dateTime";

#[test]
fn a_concurrent_writer_forces_a_conflict_and_a_rollback() {
    let store = MemoryStore::new();
    let mut conn = connection(&store);

    let mut entity = Entity::new(q("ex:Project"));
    entity.set(q("ex:label"), Literal::string("Alpha")).unwrap();
    entity.create(&mut conn).unwrap();

    // someone else writes between our read and our update
    store.tamper_modified(entity.iri(), FOREIGN_STAMP);

    entity.set(q("ex:label"), Literal::string("Beta")).unwrap();
    let err = entity.update(&mut conn).unwrap_err();
    assert!(matches!(err, TripodError::Conflict(_)));
    assert!(!conn.in_transaction());

    // nothing of the failed update is visible
    let read = Entity::read(&mut conn, entity.iri()).unwrap();
    assert_eq!(
        read.get(&q("ex:label")),
        Some(&Value::Literal(Literal::string("Alpha")))
    );
    assert_eq!(
        read.metadata().unwrap().modified().to_string(),
        "2030-01-01T00:00:00Z"
    );

    // the local change survives the failed write, so the caller can
    // re-read and retry
    assert!(!entity.changeset().is_empty());
}

#[test]
fn a_clean_retry_after_a_conflict_succeeds() {
    let store = MemoryStore::new();
    let mut conn = connection(&store);

    let mut entity = Entity::new(q("ex:Project"));
    entity.set(q("ex:label"), Literal::string("Alpha")).unwrap();
    entity.create(&mut conn).unwrap();

    store.tamper_modified(entity.iri(), FOREIGN_STAMP);
    entity.set(q("ex:label"), Literal::string("Beta")).unwrap();
    assert!(entity.update(&mut conn).is_err());

    // re-read for fresh state, reapply, retry
    let mut fresh = Entity::read(&mut conn, entity.iri()).unwrap();
    fresh.set(q("ex:label"), Literal::string("Beta")).unwrap();
    fresh.update(&mut conn).unwrap();

    let read = Entity::read(&mut conn, fresh.iri()).unwrap();
    assert_eq!(
        read.get(&q("ex:label")),
        Some(&Value::Literal(Literal::string("Beta")))
    );
}

#[test]
fn the_first_of_two_racing_copies_wins() {
    let store = MemoryStore::new();
    let mut conn = connection(&store);

    let mut entity = Entity::new(q("ex:Project"));
    entity.set(q("ex:label"), Literal::string("Alpha")).unwrap();
    entity.create(&mut conn).unwrap();

    let mut first = Entity::read(&mut conn, entity.iri()).unwrap();
    let mut second = Entity::read(&mut conn, entity.iri()).unwrap();

    first.set(q("ex:label"), Literal::string("Beta")).unwrap();
    first.update(&mut conn).unwrap();

    second.set(q("ex:label"), Literal::string("Gamma")).unwrap();
    let err = second.update(&mut conn).unwrap_err();
    assert!(matches!(err, TripodError::Conflict(_)));

    let read = Entity::read(&mut conn, entity.iri()).unwrap();
    assert_eq!(
        read.get(&q("ex:label")),
        Some(&Value::Literal(Literal::string("Beta")))
    );
}

#[test]
fn delete_wins_over_a_concurrent_update() {
    let store = MemoryStore::new();
    let mut conn = connection(&store);

    let mut entity = Entity::new(q("ex:Project"));
    entity.set(q("ex:label"), Literal::string("Alpha")).unwrap();
    entity.create(&mut conn).unwrap();

    // delete is unguarded, so a foreign timestamp does not stop it
    store.tamper_modified(entity.iri(), FOREIGN_STAMP);
    entity.delete(&mut conn).unwrap();
    assert!(!store.subject_exists(entity.iri()));
}
