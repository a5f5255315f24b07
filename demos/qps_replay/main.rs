use clap::Parser;
use slice_window::measure::{self, LatencyHistogram};
use slice_window::{
    Clock, HistogramGenerator, RollingCounter, SliceWindow, SliceWindowOptions, TickerClock,
};
use spdlog::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
struct Args {
    /// Number of buckets kept in the window.
    #[arg(long, default_value_t = 10)]
    samples: usize,
    /// Span of a single bucket in milliseconds.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
    /// How many reporting ticks to run, one per bucket interval.
    #[arg(long, default_value_t = 30)]
    ticks: u64,
    /// Worker threads generating load.
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let options = SliceWindowOptions::new(args.samples, args.interval_ms);
    options.validate()?;

    info!(
        "[System] Replaying load over a {}x{}ms window with {} workers...",
        args.samples, args.interval_ms, args.threads
    );

    let clock: Arc<dyn Clock> = Arc::new(TickerClock::default());
    let counter = Arc::new(RollingCounter::with_clock(options, clock.clone())?);
    let latencies: Arc<SliceWindow<LatencyHistogram>> = Arc::new(
        SliceWindow::<LatencyHistogram>::builder()
            .options(options)
            .generator(HistogramGenerator::nanos()?)
            .clock(clock.clone())
            .deprecated_callback(|buckets| {
                if let Ok(stats) = measure::summarize(buckets) {
                    debug!("[Rotation] {} live buckets:{}", buckets.len(), stats.format_stats());
                }
            })
            .build()?,
    );

    let run_for = Duration::from_millis(args.interval_ms * args.ticks);
    let workers: Vec<_> = (0..args.threads)
        .map(|worker_id| {
            let counter = counter.clone();
            let latencies = latencies.clone();
            thread::spawn(move || {
                let started = Instant::now();
                let mut sent = 0u64;
                while started.elapsed() < run_for {
                    let op = Instant::now();
                    if counter.add(1).is_err() {
                        continue;
                    }
                    if let Ok(bucket) = latencies.current_bucket() {
                        measure::record(&bucket, op.elapsed());
                    }
                    sent += 1;
                    if sent % 1024 == 0 {
                        thread::yield_now();
                    }
                }
                info!("[Worker:{}] sent {} events", worker_id, sent);
            })
        })
        .collect();

    for tick in 0..args.ticks {
        thread::sleep(Duration::from_millis(args.interval_ms));
        let stats = measure::summarize(&latencies.values())?;
        info!(
            "[Tick:{}] sum={}, qps={:.0},{}",
            tick,
            counter.sum(),
            counter.qps(),
            stats.format_stats()
        );
    }

    for worker in workers {
        if worker.join().is_err() {
            error!("[System] worker panicked");
        }
    }

    info!("[System] Done! final qps={:.0}", counter.qps());
    Ok(())
}
