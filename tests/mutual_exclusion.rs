use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lamport_mutex::config::{ClusterConfig, HoldPolicy};
use lamport_mutex::order::Timestamp;
use lamport_mutex::sync::{Cluster, Driver, Ledger, Phase, Resource};
use rand::Rng;

// Read-modify-write without atomicity across the two variables, only correct if callers
// are mutually excluded
#[derive(Default)]
struct Counters {
    incr: AtomicI32,
    decr: AtomicI32,
    inside: AtomicUsize,
    overlaps: AtomicUsize,
}

impl Resource for Counters {
    fn occupy(&self, _token: Timestamp) {
        if self.inside.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let i = self.incr.load(Ordering::Relaxed);
        let d = self.decr.load(Ordering::Relaxed);
        std::thread::yield_now();
        self.incr.store(i + 1, Ordering::Relaxed);
        self.decr.store(d - 1, Ordering::Relaxed);
    }
    fn release(&self, _token: Timestamp) {
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn mutual_exclusion() {
    const N_PROCS: usize = 4;
    const ROUNDS: usize = 25;
    let counters = Arc::new(Counters::default());
    let cluster = Cluster::start(
        &ClusterConfig::new(N_PROCS, HoldPolicy::random_millis(0, 2)),
        counters.clone(),
    )
    .unwrap();

    let ths: Vec<_> = cluster
        .processes()
        .iter()
        .map(|p| {
            let p = p.clone();
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    p.request().unwrap();
                }
                p.wait_idle();
            })
        })
        .collect();
    ths.into_iter().for_each(|th| th.join().unwrap());

    let work = (N_PROCS * ROUNDS) as i32;
    assert_eq!(counters.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(counters.incr.load(Ordering::Relaxed), work);
    assert_eq!(counters.decr.load(Ordering::Relaxed), -work);
    cluster.shutdown();
}

#[test]
fn random_clusters_grant_in_timestamp_order() {
    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let n_procs = rng.gen_range(1..=6);
        let rounds = rng.gen_range(1..=6);
        let ledger = Arc::new(Ledger::new());
        let cluster = Cluster::start(
            &ClusterConfig::new(n_procs, HoldPolicy::random_millis(0, 3)),
            ledger.clone(),
        )
        .unwrap();

        let drivers: Vec<_> = cluster
            .processes()
            .iter()
            .map(|p| Driver::spawn(p.clone()))
            .collect();
        drivers.iter().for_each(|d| d.add_occupy_times(rounds));
        drivers.iter().for_each(Driver::wait_done);

        let grants = ledger.grants();
        assert_eq!(ledger.violations(), 0);
        assert_eq!(grants.len(), n_procs * rounds);
        assert!(grants.windows(2).all(|w| w[0] < w[1]));
        for pid in 0..n_procs {
            assert_eq!(grants.iter().filter(|t| t.owner() == pid).count(), rounds);
        }

        drivers.into_iter().for_each(Driver::stop);
        cluster.shutdown();
    }
}

#[test]
fn no_starvation() {
    let ledger = Arc::new(Ledger::new());
    let cluster = Cluster::start(
        &ClusterConfig::new(3, HoldPolicy::Fixed(Duration::from_millis(50))),
        ledger.clone(),
    )
    .unwrap();
    let p0 = cluster.process(0).unwrap().clone();
    let p2 = cluster.process(2).unwrap().clone();

    let first = p0.request().unwrap();
    while ledger.holder().is_none() {
        std::thread::sleep(Duration::from_millis(1));
    }
    // P2 queues behind P0, then P0 immediately asks again
    let waiting = p2.request().unwrap();
    std::thread::sleep(Duration::from_millis(10));
    let again = p0.request().unwrap();
    assert!(waiting < again);

    cluster.wait_idle();
    assert_eq!(ledger.grants(), vec![first, waiting, again]);
    assert!(cluster.processes().iter().all(|p| p.phase() == Phase::Idle));
    cluster.shutdown();
}

#[test]
fn clocks_never_go_back() {
    let cluster = Cluster::start(
        &ClusterConfig::new(3, HoldPolicy::Immediate),
        Arc::new(Ledger::new()),
    )
    .unwrap();
    let mut last = vec![0; cluster.len()];
    for round in 0..10 {
        let p = cluster.process(round % 3).unwrap();
        p.request().unwrap();
        for (pid, p) in cluster.processes().iter().enumerate() {
            let now = p.clock();
            assert!(now >= last[pid]);
            last[pid] = now;
        }
    }
    cluster.wait_idle();
    cluster.shutdown();
}
