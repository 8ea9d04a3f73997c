//! Periodic producer/consumer run over one latest-value buffer.
//!
//! A producer thread pushes an incrementing step counter every producer
//! period; a consumer thread reads every consumer period. Both tick on
//! absolute deadlines (a late tick does not shift the following ones) until a
//! shared stop flag is raised.
//!
//! ```text
//!   producer:  put(1) ... put(2) ... put(3) ... put(4) ...
//!                 \          \          \
//!   consumer:   get ........ get ........ get ......
//!
//!   lag = consumer step - producer step of the value read
//! ```

use crate::recorder::{PerfRecorder, PerfStage, now_ns};
use crate::{Stats, compute_stats};
use lvb_config::BenchConfig;
use lvb_core::{Lvb, ReadStaleness, Reader, RingConfig, Writer};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Value pushed through the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Producer step that pushed the value, starting at 1.
    pub step: u64,
    /// `now_ns()` right before the put.
    pub ts_ns: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProducerStats {
    pub steps: u64,
    pub pushed: u64,
    /// Longest run of refused puts.
    pub max_stale: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsumerStats {
    pub steps: u64,
    pub popped: u64,
    /// Longest idle run after the first value.
    pub max_stale: u32,
    /// Ticks spent before the first value arrived.
    pub awaiting_first: u32,
    /// Largest consumer step minus producer step over fresh reads.
    pub max_lag_steps: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodicReport {
    pub config: BenchConfig,
    pub slack: usize,
    pub size: usize,
    pub elapsed_ns: u64,
    pub producer: ProducerStats,
    pub consumer: ConsumerStats,
    pub put_ns: Option<Stats>,
    pub get_ns: Option<Stats>,
    pub handoff_ns: Option<Stats>,
}

/// Sleeps until `deadline` unless it has already passed.
fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}

fn counting_writer(
    writer: &mut Writer<Sample>,
    mut deadline: Instant,
    period: Duration,
    stop: &AtomicBool,
    rec: &mut PerfRecorder,
) -> ProducerStats {
    let mut stats = ProducerStats::default();
    sleep_until(deadline);
    while !stop.load(Ordering::Relaxed) {
        stats.steps += 1;

        rec.begin(PerfStage::Put);
        let stale = writer.put(Sample {
            step: stats.steps,
            ts_ns: now_ns(),
        });
        rec.end(PerfStage::Put);

        if stale == 0 {
            stats.pushed += 1;
        } else {
            stats.max_stale = stats.max_stale.max(stale);
        }

        deadline += period;
        sleep_until(deadline);
    }
    stats
}

fn counting_reader(
    reader: &mut Reader<Sample>,
    mut deadline: Instant,
    period: Duration,
    stop: &AtomicBool,
    rec: &mut PerfRecorder,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();
    sleep_until(deadline);
    while !stop.load(Ordering::Relaxed) {
        stats.steps += 1;

        rec.begin(PerfStage::Get);
        let (sample, code) = reader.get_with_staleness();
        rec.end(PerfStage::Get);

        match ReadStaleness::from(code) {
            ReadStaleness::Fresh => {
                rec.record(PerfStage::Handoff, now_ns().saturating_sub(sample.ts_ns));
                stats.popped += 1;
                let lag = stats.steps as i64 - sample.step as i64;
                if stats.popped == 1 || lag > stats.max_lag_steps {
                    stats.max_lag_steps = lag;
                }
            }
            ReadStaleness::AwaitingFirst(n) => stats.awaiting_first = n,
            ReadStaleness::Idle(n) => stats.max_stale = stats.max_stale.max(n),
        }

        deadline += period;
        sleep_until(deadline);
    }
    stats
}

/// Runs one periodic benchmark as described by `cfg`.
///
/// Blocks for about `cfg.duration()`.
pub fn run(cfg: &BenchConfig) -> PeriodicReport {
    let slack = cfg.effective_slack();
    let ring = RingConfig::new(slack);
    let (mut writer, mut reader) = Lvb::<Sample>::with_config(ring).split();
    let stop = AtomicBool::new(false);

    info!(
        slack,
        size = ring.size(),
        prod_period_ns = cfg.prod_period_ns,
        cons_period_ns = cfg.cons_period_ns,
        duration_ms = cfg.duration_ms,
        "starting periodic run"
    );

    let prod_start = Instant::now() + cfg.start_delay();
    let cons_start = prod_start + cfg.consumer_offset();
    let run_start = Instant::now();

    let ((producer, put_rec), (consumer, get_rec)) = thread::scope(|s| {
        let stop = &stop;
        let producer = s.spawn(move || {
            let mut rec = PerfRecorder::new();
            let stats = counting_writer(&mut writer, prod_start, cfg.prod_period(), stop, &mut rec);
            debug!(?stats, "producer finished");
            (stats, rec)
        });
        let consumer = s.spawn(move || {
            let mut rec = PerfRecorder::new();
            let stats = counting_reader(&mut reader, cons_start, cfg.cons_period(), stop, &mut rec);
            debug!(?stats, "consumer finished");
            (stats, rec)
        });

        thread::sleep(cfg.duration());
        stop.store(true, Ordering::Relaxed);

        (
            producer.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
            consumer.join().unwrap_or_else(|e| std::panic::resume_unwind(e)),
        )
    });

    let elapsed_ns = run_start.elapsed().as_nanos() as u64;
    let mut rec = put_rec;
    rec.merge(&get_rec);

    let stats_of = |stage: PerfStage| compute_stats(&mut rec.samples(stage).to_vec());
    let report = PeriodicReport {
        config: cfg.clone(),
        slack,
        size: ring.size(),
        elapsed_ns,
        put_ns: stats_of(PerfStage::Put),
        get_ns: stats_of(PerfStage::Get),
        handoff_ns: stats_of(PerfStage::Handoff),
        producer,
        consumer,
    };

    info!(
        pushed = report.producer.pushed,
        popped = report.consumer.popped,
        prod_max_stale = report.producer.max_stale,
        cons_max_stale = report.consumer.max_stale,
        "periodic run finished"
    );
    report
}
