use anyhow::{Context, Result};
use lvb_config::BenchConfig;
use lvb_core::{CACHE_LINE_SIZE, Lvb, RingConfig};
use lvb_perf::periodic::{self, Sample};
use lvb_perf::report::{
    print_periodic_report, print_resources, print_result_row, print_table_header, section_header,
};
use lvb_perf::{capture_rusage, format_bytes, measure_batched};
use tracing::info;
use tracing_subscriber::EnvFilter;

const BATCHES: usize = 1_000;
const BATCH_SIZE: usize = 10_000;
const WARMUP: usize = 10;

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Single-thread cost of each buffer operation on a ring of `slack`.
fn print_op_costs(slack: usize) {
    section_header(&format!("Single-thread operation cost (slack {slack})"));
    print_table_header();

    let (mut writer, mut reader) = Lvb::<Sample>::with_config(RingConfig::new(slack)).split();
    let mut step = 0;
    let rows = [
        measure_batched("put+get", BATCHES, BATCH_SIZE, WARMUP, || {
            step += 1;
            writer.put(std::hint::black_box(Sample { step, ts_ns: step }));
            std::hint::black_box(reader.get_with_staleness());
        }),
        measure_batched("reader_advance (empty)", BATCHES, BATCH_SIZE, WARMUP, || {
            std::hint::black_box(reader.reader_advance());
        }),
    ];
    for r in rows.iter().flatten() {
        print_result_row(r);
    }

    // Nothing reads any more, so the ring fills and every advance is refused.
    while writer.put(Sample::default()) == 0 {}
    if let Some(r) = measure_batched("writer_advance (full)", BATCHES, BATCH_SIZE, WARMUP, || {
        std::hint::black_box(writer.writer_advance());
    }) {
        print_result_row(&r);
    }
}

fn main() -> Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => BenchConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => BenchConfig::default(),
    };
    init_tracing(&cfg.log_level);
    info!(?cfg, "configuration");

    let slack = cfg.effective_slack();
    let size = RingConfig::new(slack).size();
    let slot_bytes = std::mem::size_of::<Sample>().next_multiple_of(CACHE_LINE_SIZE);
    println!(
        "\n  Cache line: {CACHE_LINE_SIZE} B, ring of {size} slots ({} of slots)",
        format_bytes((size * slot_bytes) as u64),
    );

    let before = capture_rusage();
    print_op_costs(slack);
    let report = periodic::run(&cfg);
    let delta = capture_rusage().since(&before);

    print_periodic_report(&report);
    print_resources(&delta);

    if let Some(path) = &cfg.json_report {
        let json = serde_json::to_string_pretty(&report).context("serializing report")?;
        std::fs::write(path, json).with_context(|| format!("writing {path}"))?;
        info!(path = %path, "wrote JSON report");
    }
    Ok(())
}
