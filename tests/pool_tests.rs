//! Engine pool rental semantics against scripted engines.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chess_puzzle_gen::pool::{EnginePool, PoolError};

fn stub_pool(size: usize) -> EnginePool {
    let path = common::stub_engine("");
    EnginePool::new(
        path.to_str().expect("utf-8 temp path"),
        size,
        1,
        Duration::from_millis(2),
    )
    .expect("stub pool")
}

#[test]
fn construction_fails_for_missing_binary() {
    let result = EnginePool::new(
        "/no/such/engine-binary",
        1,
        1,
        Duration::from_millis(2),
    );
    assert!(matches!(
        result,
        Err(PoolError::EnginePathNotFound { .. })
    ));
}

#[test]
fn census_is_conserved_across_rentals() {
    let pool = stub_pool(2);
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.idle_count(), 2);

    let first = pool.acquire();
    let second = pool.acquire();
    assert_eq!(pool.idle_count(), 0);

    pool.release(first).unwrap();
    assert_eq!(pool.idle_count(), 1);
    pool.release(second).unwrap();
    assert_eq!(pool.idle_count(), 2);
}

#[test]
fn contended_acquire_observes_release() {
    let pool = Arc::new(stub_pool(1));
    let held = pool.acquire();

    let contender = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let instance = pool.acquire();
            pool.release(instance).unwrap();
        })
    };

    // The second renter must be parked while the instance is out.
    thread::sleep(Duration::from_millis(50));
    assert!(!contender.is_finished());

    pool.release(held).unwrap();
    contender.join().unwrap();
    assert_eq!(pool.idle_count(), 1);
}

#[test]
fn interleaved_rentals_from_many_threads() {
    let pool = Arc::new(stub_pool(2));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..10 {
                    let instance = pool.acquire();
                    pool.release(instance).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(pool.idle_count(), 2);
}

#[test]
fn foreign_release_is_refused() {
    let ours = stub_pool(1);
    let theirs = stub_pool(1);

    let stranger = theirs.acquire();
    assert!(matches!(
        ours.release(stranger),
        Err(PoolError::ForeignRelease { .. })
    ));
    assert_eq!(ours.idle_count(), 1);
    assert_eq!(theirs.idle_count(), 0);
}

#[test]
fn close_drains_idle_queue() {
    let pool = stub_pool(2);
    pool.close();
    assert_eq!(pool.idle_count(), 0);
}
