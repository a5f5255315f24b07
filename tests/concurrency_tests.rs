use slice_window::{Bucket, BucketGenerator, DefaultGenerator, SliceWindow};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const SAMPLES: usize = 5;
const INTERVAL: u64 = 1000;
const STEPS: u64 = 40;

/// Payload whose halves must always match.
type Pair = (u64, u64);

struct CountingGenerator {
    resets: Arc<AtomicU64>,
}

impl BucketGenerator<Pair> for CountingGenerator {
    fn new_empty_bucket(&self) -> Pair {
        (0, 0)
    }

    fn reset_bucket_to(&self, bucket: &Bucket<Pair>, start: u64) {
        self.resets.fetch_add(1, Ordering::Relaxed);
        bucket.reset_to(start, self.new_empty_bucket());
    }
}

#[test]
fn test_one_rotation_per_boundary_under_load() {
    let resets = Arc::new(AtomicU64::new(0));
    let window = Arc::new(
        SliceWindow::new(
            SAMPLES,
            INTERVAL,
            CountingGenerator {
                resets: resets.clone(),
            },
        )
        .unwrap(),
    );
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let window = window.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                for step in 1..=STEPS {
                    barrier.wait();
                    let now = step * INTERVAL + worker as u64;
                    let bucket = window.current_bucket_of_time(now).unwrap();
                    assert_eq!(bucket.start(), step * INTERVAL);
                    bucket.update(|(a, b)| (a + 1, b + 1));

                    let (a, b) = *bucket.load();
                    assert_eq!(a, b, "torn payload at step {}", step);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    // The first SAMPLES steps fill empty slots, every later step rotates exactly one.
    assert_eq!(resets.load(Ordering::Relaxed), STEPS - SAMPLES as u64);

    let live = window.values_with_time(STEPS * INTERVAL);
    assert_eq!(live.len(), SAMPLES);
    for bucket in live {
        assert_eq!(*bucket.load(), (THREADS as u64, THREADS as u64));
    }
}

#[test]
fn test_racing_first_touch_creates_one_bucket() {
    for _ in 0..50 {
        let window = Arc::new(
            SliceWindow::new(SAMPLES, INTERVAL, DefaultGenerator::<u64>::new())
                .unwrap(),
        );
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let window = window.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let bucket = window.current_bucket_of_time(4321).unwrap();
                    bucket.update(|count| count + 1);
                    bucket
                })
            })
            .collect();

        let buckets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for bucket in &buckets {
            assert!(Arc::ptr_eq(bucket, &buckets[0]));
        }
        assert_eq!(*buckets[0].load(), THREADS as u64);
    }
}

#[test]
fn test_deprecated_callback_never_overlaps() {
    let window = Arc::new(
        SliceWindow::new(SAMPLES, INTERVAL, DefaultGenerator::<u64>::new())
            .unwrap(),
    );
    let inside = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicU64::new(0));
    {
        let inside = inside.clone();
        let calls = calls.clone();
        window.set_deprecated_callback(move |buckets| {
            assert!(
                !inside.swap(true, Ordering::SeqCst),
                "deprecated callback re-entered"
            );
            assert!(buckets.len() <= SAMPLES);
            calls.fetch_add(1, Ordering::Relaxed);
            thread::yield_now();
            inside.store(false, Ordering::SeqCst);
        });
    }
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let window = window.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                for step in 1..=STEPS {
                    barrier.wait();
                    window.current_bucket_of_time(step * INTERVAL).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert!(calls.load(Ordering::Relaxed) > 0);
}

#[test]
fn test_readers_run_alongside_writers() {
    let window = Arc::new(
        SliceWindow::new(SAMPLES, INTERVAL, DefaultGenerator::<u64>::new())
            .unwrap(),
    );
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let window = window.clone();
        let done = done.clone();
        thread::spawn(move || {
            for now in 1..=50_000u64 {
                window
                    .current_bucket_of_time(now)
                    .unwrap()
                    .update(|count| count + 1);
            }
            done.store(true, Ordering::Release);
        })
    };

    let reader = {
        let window = window.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut reads = 0u64;
            while !done.load(Ordering::Acquire) {
                for bucket in window.values_with_time(50_000) {
                    assert_eq!(bucket.start() % INTERVAL, 0);
                }
                reads += 1;
            }
            reads
        })
    };

    writer.join().unwrap();
    assert!(reader.join().unwrap() > 0);

    let total: u64 = window
        .values_with_time(50_000)
        .iter()
        .map(|b| *b.load())
        .sum();
    // 50,000 is the first millisecond of its own slice.
    assert_eq!(total, 5 * INTERVAL + 1 - INTERVAL);
}
