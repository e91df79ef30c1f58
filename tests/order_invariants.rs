//! Order invariants under randomized operation sequences
//!
//! After every operation, committed or rejected:
//! - positions are exactly 1..=N with no gaps or duplicates
//! - every ordered key refers to an existing flight
//! - the registry matches a simple in-memory model
//!
//! Fault injection aborts writes part way through a shift; the registry
//! must be unchanged afterwards.

use flightseq::fault_point::points;
use flightseq::flights::{FlightStore, NewFlight};
use flightseq::order::{OrderRegistry, SequenceError, SequenceView};
use flightseq::storage::Database;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

const FLIGHT_COUNT: usize = 12;

fn new_flight(code: &str) -> NewFlight {
    NewFlight {
        code: code.to_string(),
        status: "delayed".to_string(),
        year: 2024,
        month: 11,
        day: 2,
        hour: 23,
        minute: 15,
        origin: "AQP".to_string(),
        destination: "LIM".to_string(),
    }
}

fn setup() -> (TempDir, Database, Vec<String>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(temp_dir.path()).expect("open");
    let codes: Vec<String> = (0..FLIGHT_COUNT).map(|i| format!("F{:02}", i)).collect();
    {
        let store = FlightStore::new(&db);
        for code in &codes {
            store.create(new_flight(code)).expect("create flight");
        }
    }
    (temp_dir, db, codes)
}

fn assert_invariants(db: &Database, model: &[String]) {
    let entries = OrderRegistry::new(db).load_ordered();

    let positions: Vec<u32> = entries.iter().map(|e| e.position).collect();
    let dense: Vec<u32> = (1..=entries.len() as u32).collect();
    assert_eq!(positions, dense, "positions must be exactly 1..=N");

    let keys: Vec<&String> = entries.iter().map(|e| &e.record_key).collect();
    let expected: Vec<&String> = model.iter().collect();
    assert_eq!(keys, expected, "registry diverged from model");

    db.read(|t| {
        for entry in &entries {
            assert!(t.flights().contains(&entry.record_key));
        }
        t.order().check_contiguous().expect("contiguous");
    });
}

// =============================================================================
// Randomized operations
// =============================================================================

#[test]
fn test_random_operations_preserve_contiguity() {
    let (_dir, db, codes) = setup();
    let store = FlightStore::new(&db);
    let registry = OrderRegistry::new(&db);
    let mut rng = StdRng::seed_from_u64(0x5EED_F11E);
    let mut model: Vec<String> = Vec::new();

    for _ in 0..300 {
        let mut view = SequenceView::load(registry, &store).unwrap();
        let code = &codes[rng.gen_range(0..codes.len())];
        let ordered = model.iter().position(|k| k == code);

        match (rng.gen_range(0..4), ordered) {
            (0, None) => {
                view.insert_front(store.find(code).unwrap()).unwrap();
                model.insert(0, code.clone());
            }
            (1, None) => {
                view.insert_end(store.find(code).unwrap()).unwrap();
                model.push(code.clone());
            }
            (2, None) if !model.is_empty() => {
                let index = rng.gen_range(0..model.len());
                let reference = view.node_at(index).unwrap();
                view.insert_before(store.find(code).unwrap(), reference)
                    .unwrap();
                model.insert(index, code.clone());
            }
            (_, Some(index)) if rng.gen_bool(0.5) => {
                let node = view.node_at(index).unwrap();
                let record = view.extract(node).unwrap();
                assert_eq!(&record.code, code);
                model.remove(index);
            }
            (_, Some(_)) => {
                let result = view.insert_end(store.find(code).unwrap());
                assert!(matches!(result, Err(SequenceError::Conflict(_))));
            }
            _ => {}
        }

        assert_eq!(view.keys(), model);
        assert_invariants(&db, &model);
    }
}

#[test]
fn test_random_registry_positions_rejected_out_of_range() {
    let (_dir, db, codes) = setup();
    let registry = OrderRegistry::new(&db);
    let mut rng = StdRng::seed_from_u64(7);
    let mut model: Vec<String> = Vec::new();

    for code in &codes {
        let len = model.len() as u32;
        let bad = len + 2 + rng.gen_range(0..5);
        assert!(matches!(
            registry.insert_at(bad, code),
            Err(SequenceError::OutOfRange { .. })
        ));
        assert!(matches!(
            registry.insert_at(0, code),
            Err(SequenceError::OutOfRange { .. })
        ));

        let position = rng.gen_range(1..=len + 1);
        let entry = registry.insert_at(position, code).unwrap();
        assert_eq!(entry.position, position);
        model.insert(position as usize - 1, code.clone());
        assert_invariants(&db, &model);
    }
}

// =============================================================================
// Atomicity under injected faults
// =============================================================================

#[test]
fn test_fault_mid_shift_rolls_back_everything() {
    let (_dir, db, codes) = setup();
    let store = FlightStore::new(&db);
    let registry = OrderRegistry::new(&db);
    let mut rng = StdRng::seed_from_u64(42);

    let mut model: Vec<String> = Vec::new();
    for code in &codes[..8] {
        registry.insert_at(model.len() as u32 + 1, code).unwrap();
        model.push(code.clone());
    }
    let before_sequence = db.last_sequence_number();

    for code in &codes[8..] {
        // Inserting at the front shifts all 8 rows; fail somewhere inside
        let hit = rng.gen_range(1..=8);
        db.faults().arm(points::REINDEX_ROW, hit);

        let mut view = SequenceView::load(registry, &store).unwrap();
        let err = view.insert_front(store.find(code).unwrap()).unwrap_err();
        assert!(matches!(err, SequenceError::StorageFailure(_)));
        assert_eq!(view.keys(), model);
        assert_invariants(&db, &model);
    }
    assert_eq!(db.last_sequence_number(), before_sequence);

    db.faults().arm(points::REINDEX_ROW, 3);
    let mut view = SequenceView::load(registry, &store).unwrap();
    let first = view.node_at(0).unwrap();
    assert!(view.extract(first).is_err());
    assert_invariants(&db, &model);
}

#[test]
fn test_fault_before_wal_append_rolls_back() {
    let (_dir, db, codes) = setup();
    let registry = OrderRegistry::new(&db);
    registry.insert_at(1, &codes[0]).unwrap();

    db.faults().arm(points::WAL_BEFORE_APPEND, 1);
    assert!(registry.insert_at(1, &codes[1]).is_err());
    assert_invariants(&db, &[codes[0].clone()]);

    // The next write proceeds normally
    registry.insert_at(1, &codes[1]).unwrap();
    assert_invariants(&db, &[codes[1].clone(), codes[0].clone()]);
}
