//! Sequence behavior through the public API
//!
//! Covers:
//! - insert at the front, before a node, at the end
//! - extract from any position
//! - conflicting writers from views loaded before either commits
//! - durability of the order across reopen

use std::sync::Barrier;
use std::thread;

use flightseq::flights::{Flight, FlightStore, NewFlight};
use flightseq::order::{OrderRegistry, SequenceError, SequenceView};
use flightseq::storage::Database;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn new_flight(code: &str) -> NewFlight {
    NewFlight {
        code: code.to_string(),
        status: "scheduled".to_string(),
        year: 2025,
        month: 3,
        day: 14,
        hour: 9,
        minute: 30,
        origin: "LIM".to_string(),
        destination: "CUZ".to_string(),
    }
}

fn create_flights(store: &FlightStore<'_>, codes: &[&str]) -> Vec<Flight> {
    codes
        .iter()
        .map(|code| store.create(new_flight(code)).expect("create flight"))
        .collect()
}

/// Positions of every entry, in order, as (key, position)
fn positions(db: &Database) -> Vec<(String, u32)> {
    OrderRegistry::new(db)
        .load_ordered()
        .into_iter()
        .map(|e| (e.record_key, e.position))
        .collect()
}

fn expected(keys: &[&str]) -> Vec<(String, u32)> {
    keys.iter()
        .enumerate()
        .map(|(i, k)| (k.to_string(), i as u32 + 1))
        .collect()
}

fn build_abc(db: &Database, store: &FlightStore<'_>) {
    let mut view = SequenceView::load(OrderRegistry::new(db), store).unwrap();
    for flight in create_flights(store, &["A", "B", "C"]) {
        view.insert_end(flight).unwrap();
    }
    assert_eq!(positions(db), expected(&["A", "B", "C"]));
}

// =============================================================================
// Single-writer scenarios
// =============================================================================

#[test]
fn test_insert_front_twice_on_empty_sequence() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    let flights = create_flights(&store, &["X", "Y"]);

    let mut view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    view.insert_front(flights[0].clone()).unwrap();
    view.insert_front(flights[1].clone()).unwrap();

    assert_eq!(view.keys(), vec!["Y", "X"]);
    assert_eq!(positions(&db), expected(&["Y", "X"]));
}

#[test]
fn test_insert_before_middle_node_shifts_tail() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);
    let d = store.create(new_flight("D")).unwrap();

    let mut view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    let b = view.node_at(1).unwrap();
    assert_eq!(view.record(b).unwrap().code, "B");
    view.insert_before(d, b).unwrap();

    assert_eq!(view.keys(), vec!["A", "D", "B", "C"]);
    assert_eq!(positions(&db), expected(&["A", "D", "B", "C"]));
}

#[test]
fn test_extract_first_node() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);

    let mut view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    let first = view.node_at(0).unwrap();
    let extracted = view.extract(first).unwrap();

    assert_eq!(extracted.code, "A");
    assert_eq!(view.keys(), vec!["B", "C"]);
    assert_eq!(positions(&db), expected(&["B", "C"]));

    // The flight itself survives extraction
    assert!(store.find("A").is_ok());
}

#[test]
fn test_extract_middle_and_last() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);

    let mut view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    let last = view.last_node().unwrap();
    assert_eq!(view.extract(last).unwrap().code, "C");
    let b = view.find("B").unwrap();
    assert_eq!(view.extract(b).unwrap().code, "B");

    assert_eq!(view.to_string(), "START <-> A <-> END");
    assert_eq!(positions(&db), expected(&["A"]));
}

#[test]
fn test_view_reload_matches_registry() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);

    let view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    let via_iter: Vec<String> = view.iter().map(|f| f.code.clone()).collect();
    assert_eq!(via_iter, vec!["A", "B", "C"]);
    assert_eq!(view.first().unwrap().code, "A");
    assert_eq!(view.last().unwrap().code, "C");
    assert!(matches!(
        view.node_at(3),
        Err(SequenceError::OutOfRange { index: 3, len: 3 })
    ));
}

#[test]
fn test_repeated_load_yields_identical_order() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);
    let registry = OrderRegistry::new(&db);

    let first = SequenceView::load(registry, &store).unwrap();
    let second = SequenceView::load(registry, &store).unwrap();

    assert_ne!(first.view_id(), second.view_id());
    assert_eq!(first.keys(), second.keys());
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(positions(&db), expected(&["A", "B", "C"]));
}

#[test]
fn test_insert_end_then_extract_last_restores_order() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    let registry = OrderRegistry::new(&db);
    let base = create_flights(&store, &["A", "B", "C", "D"]);
    let r = store.create(new_flight("R")).unwrap();

    for n in 0..=base.len() {
        let mut view = SequenceView::load(registry, &store).unwrap();
        assert_eq!(view.len(), n);
        assert!(matches!(
            view.node_at(n),
            Err(SequenceError::OutOfRange { index, len }) if index == n && len == n
        ));

        let before_keys = view.keys();
        let before_positions = positions(&db);

        view.insert_end(r.clone()).unwrap();
        let last = view.node_at(view.len() - 1).unwrap();
        let extracted = view.extract(last).unwrap();

        assert_eq!(extracted, r);
        assert_eq!(view.keys(), before_keys);
        assert_eq!(positions(&db), before_positions);

        if let Some(next) = base.get(n) {
            view.insert_end(next.clone()).unwrap();
        }
    }
}

// =============================================================================
// Conflicting writers
// =============================================================================

#[test]
fn test_stale_view_extracts_by_key() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);
    let r = store.create(new_flight("R")).unwrap();

    let registry = OrderRegistry::new(&db);
    let mut stale = SequenceView::load(registry, &store).unwrap();
    let mut fresh = SequenceView::load(registry, &store).unwrap();
    fresh.insert_front(r).unwrap();

    let a = stale.node_at(0).unwrap();
    assert_eq!(stale.extract(a).unwrap().code, "A");
    assert_eq!(positions(&db), expected(&["R", "B", "C"]));

    // Extracting a key another writer already removed is NotFound
    let a_in_fresh = fresh.find("A").unwrap();
    assert!(matches!(
        fresh.extract(a_in_fresh),
        Err(SequenceError::NotFound(_))
    ));
    assert_eq!(fresh.keys(), vec!["R", "A", "B", "C"]);
}

#[test]
fn test_stale_view_conflicts_sequentially() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);
    let extra = create_flights(&store, &["P", "Q"]);

    let registry = OrderRegistry::new(&db);
    let mut first = SequenceView::load(registry, &store).unwrap();
    let mut second = SequenceView::load(registry, &store).unwrap();

    let b1 = first.node_at(1).unwrap();
    let b2 = second.node_at(1).unwrap();

    first.insert_before(extra[0].clone(), b1).unwrap();
    let err = second.insert_before(extra[1].clone(), b2).unwrap_err();

    assert!(matches!(err, SequenceError::Conflict(_)));
    assert_eq!(err.status_code(), 409);
    assert_eq!(second.keys(), vec!["A", "B", "C"]);
    assert_eq!(positions(&db), expected(&["A", "P", "B", "C"]));
}

#[test]
fn test_stale_view_conflicts_on_append() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    let flights = create_flights(&store, &["A", "B"]);

    let registry = OrderRegistry::new(&db);
    let mut first = SequenceView::load(registry, &store).unwrap();
    let mut second = SequenceView::load(registry, &store).unwrap();

    first.insert_end(flights[0].clone()).unwrap();
    assert!(matches!(
        second.insert_end(flights[1].clone()),
        Err(SequenceError::Conflict(_))
    ));

    // A fresh view sees the committed state and succeeds
    let mut fresh = SequenceView::load(registry, &store).unwrap();
    fresh.insert_end(flights[1].clone()).unwrap();
    assert_eq!(positions(&db), expected(&["A", "B"]));
}

#[test]
fn test_concurrent_inserts_exactly_one_wins() {
    let temp_dir = create_temp_data_dir();
    let db = Database::open(temp_dir.path()).unwrap();
    let store = FlightStore::new(&db);
    build_abc(&db, &store);
    let extra = create_flights(&store, &["P", "Q"]);

    let registry = OrderRegistry::new(&db);
    let views = [
        SequenceView::load(registry, &store).unwrap(),
        SequenceView::load(registry, &store).unwrap(),
    ];
    let barrier = Barrier::new(2);

    let results: Vec<Result<String, SequenceError>> = thread::scope(|s| {
        let handles: Vec<_> = views
            .into_iter()
            .zip(extra.iter().cloned())
            .map(|(mut view, flight)| {
                let barrier = &barrier;
                s.spawn(move || {
                    let reference = view.node_at(1).unwrap();
                    let code = flight.code.clone();
                    barrier.wait();
                    view.insert_before(flight, reference).map(|_| code)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(SequenceError::Conflict(_))))
        .count();
    assert_eq!(winners.len(), 1);
    assert_eq!(conflicts, 1);

    let winner = winners[0].as_str();
    assert_eq!(positions(&db), expected(&["A", winner, "B", "C"]));
}

// =============================================================================
// Durability
// =============================================================================

#[test]
fn test_order_survives_reopen() {
    let temp_dir = create_temp_data_dir();
    {
        let db = Database::open(temp_dir.path()).unwrap();
        let store = FlightStore::new(&db);
        build_abc(&db, &store);
        let d = store.create(new_flight("D")).unwrap();
        let mut view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
        let c = view.find("C").unwrap();
        view.insert_before(d, c).unwrap();
        let a = view.find("A").unwrap();
        view.extract(a).unwrap();
        // dropped without close: not a clean shutdown
    }

    let db = Database::open(temp_dir.path()).unwrap();
    assert!(!db.recovery_state().was_clean_shutdown);
    assert_eq!(positions(&db), expected(&["B", "D", "C"]));

    let store = FlightStore::new(&db);
    let view = SequenceView::load(OrderRegistry::new(&db), &store).unwrap();
    assert_eq!(view.to_string(), "START <-> B <-> D <-> C <-> END");
}
