//! Cross-thread behaviour of the SPSC ring: FIFO order, no torn payloads,
//! no false full/empty under real contention.

use std::thread;

use hfmd_core::{DepthMarketData, Stamped, ring, time_util};

const MESSAGES: u64 = 100_000;

/// Spin briefly, then give the other side the CPU. Keeps the tests fast on
/// runners with fewer cores than threads.
fn backoff(misses: &mut u32) {
    *misses += 1;
    if *misses % 64 == 0 {
        thread::yield_now();
    } else {
        std::hint::spin_loop();
    }
}

#[test]
fn fifo_order_survives_contention() {
    let (mut tx, mut rx) = ring::channel::<u64>(64).unwrap();

    let producer = thread::spawn(move || {
        let mut misses = 0u32;
        for i in 0..MESSAGES {
            while !tx.push(i) {
                backoff(&mut misses);
            }
        }
    });

    let mut expected = 0u64;
    let mut misses = 0u32;
    while expected < MESSAGES {
        match rx.pop() {
            Some(v) => {
                assert_eq!(v, expected, "out of order at {expected}");
                expected += 1;
            }
            None => backoff(&mut misses),
        }
    }

    producer.join().unwrap();
    assert_eq!(rx.pop(), None);
}

/// Every word of the payload carries the same sequence number; a reader that
/// saw a half-written slot would observe a mix.
#[derive(Clone, Copy)]
struct Wide([u64; 16]);

#[test]
fn payloads_are_never_torn() {
    let (mut tx, mut rx) = ring::channel::<Wide>(8).unwrap();
    const N: u64 = 50_000;

    let producer = thread::spawn(move || {
        let mut misses = 0u32;
        for i in 0..N {
            while !tx.push(Wide([i; 16])) {
                backoff(&mut misses);
            }
        }
    });

    let mut seen = 0u64;
    let mut misses = 0u32;
    while seen < N {
        match rx.pop() {
            Some(Wide(words)) => {
                assert!(words.iter().all(|&w| w == seen), "torn read at {seen}: {words:?}");
                seen += 1;
            }
            None => backoff(&mut misses),
        }
    }
    producer.join().unwrap();
}

#[test]
fn stamped_snapshots_arrive_intact_with_forward_latency() {
    let (mut tx, mut rx) = ring::channel::<Stamped<DepthMarketData>>(128).unwrap();
    const N: usize = 10_000;

    let producer = thread::spawn(move || {
        let instruments = ["au2512", "ag2512", "rb2601"];
        let mut misses = 0u32;
        for i in 0..N {
            let mut md = DepthMarketData::new(instruments[i % 3], "SHFE");
            md.volume = i as i64;
            md.last_price = 500.0 + i as f64;
            let rec = Stamped::new(md, time_util::now_cycles());
            while !tx.push(rec) {
                backoff(&mut misses);
            }
        }
    });

    let mut got = 0usize;
    let mut misses = 0u32;
    while got < N {
        let Some(rec) = rx.pop() else {
            backoff(&mut misses);
            continue;
        };
        let now = time_util::now_cycles();
        assert_eq!(rec.payload.volume, got as i64);
        assert_eq!(rec.payload.last_price, 500.0 + got as f64);
        assert_eq!(rec.payload.exchange(), "SHFE");
        // wraparound-safe delta; anything near u64::MAX would mean the
        // counter went backwards
        assert!(time_util::cycles_between(rec.capture_cycles, now) < u64::MAX / 2);
        got += 1;
    }
    producer.join().unwrap();
}
