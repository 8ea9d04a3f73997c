use crate::periodic::PeriodicReport;
use crate::recorder::STAGE_NAMES;
use crate::{BenchResult, ResourceSnapshot, Stats, format_bytes, format_count};

pub fn section_header(title: &str) {
    println!("\n{}", "─".repeat(90));
    println!("  {title}");
    println!("{}\n", "─".repeat(90));
}

pub fn print_table_header() {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max", "count",
    );
    println!("  {}", "─".repeat(100));
}

pub fn print_result_row(r: &BenchResult) {
    println!(
        "  {:<30} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}  {}",
        r.name,
        r.stats.min,
        r.stats.p50,
        r.stats.p90,
        r.stats.p99,
        r.stats.p999,
        r.stats.max,
        format_count(r.stats.count as u64),
        r.unit,
    );
}

/// Per-stage timing of a periodic run, in recorder stage order. Stages that
/// recorded nothing are left out.
pub fn stage_results(report: &PeriodicReport) -> Vec<BenchResult> {
    [&report.put_ns, &report.get_ns, &report.handoff_ns]
        .into_iter()
        .zip(STAGE_NAMES)
        .filter_map(|(stats, name): (&Option<Stats>, &str)| {
            stats.clone().map(|stats| BenchResult {
                name: name.to_string(),
                unit: "ns".to_string(),
                stats,
            })
        })
        .collect()
}

/// Where the producer's values ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Refused puts: overwritten in the writing slot before being published.
    pub overwritten: u64,
    /// Published but not yet read when the run stopped.
    pub left_in_ring: u64,
}

pub fn delivery(report: &PeriodicReport) -> Delivery {
    let p = &report.producer;
    Delivery {
        overwritten: p.steps.saturating_sub(p.pushed),
        left_in_ring: p.pushed.saturating_sub(report.consumer.popped),
    }
}

/// Share of attempts that went through, as a percentage.
fn success_pct(ok: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ok as f64 / total as f64 * 100.0
}

pub fn print_periodic_report(report: &PeriodicReport) {
    let cfg = &report.config;
    section_header(&format!(
        "Periodic run: slack {} (ring of {}), producer every {} ns, consumer every {} ns",
        report.slack, report.size, cfg.prod_period_ns, cfg.cons_period_ns,
    ));

    let p = &report.producer;
    let c = &report.consumer;
    println!("  Elapsed:          {:.1} ms", report.elapsed_ns as f64 / 1e6);
    println!(
        "  Producer:         {} steps, {} pushed ({:.1}%), longest stale run {}",
        format_count(p.steps),
        format_count(p.pushed),
        success_pct(p.pushed, p.steps),
        p.max_stale,
    );
    println!(
        "  Consumer:         {} steps, {} popped ({:.1}%), longest idle run {}",
        format_count(c.steps),
        format_count(c.popped),
        success_pct(c.popped, c.steps),
        c.max_stale,
    );
    println!("  Before first:     {} ticks", c.awaiting_first);
    println!("  Max lag:          {} steps", c.max_lag_steps);
    let d = delivery(report);
    println!(
        "  Overwritten:      {} values never published",
        format_count(d.overwritten)
    );
    println!("  Left in ring:     {} values", format_count(d.left_in_ring));

    let rows = stage_results(report);
    if !rows.is_empty() {
        println!("\n  Per-Stage Timing:\n");
        print_table_header();
        for r in &rows {
            print_result_row(r);
        }
    }
}

pub fn print_resources(delta: &ResourceSnapshot) {
    println!("\n  Resource Usage:\n");
    println!("    Max RSS:            {}", format_bytes(delta.max_rss_bytes.max(0) as u64));
    println!("    Minor faults:       {}", delta.minor_faults);
    println!("    Major faults:       {}", delta.major_faults);
    println!("    Voluntary ctx sw:   {}", delta.vol_ctx_switches);
    println!("    Involuntary ctx sw: {}", delta.invol_ctx_switches);
    println!(
        "    CPU time:           {:.1} ms user, {:.1} ms sys",
        delta.user_time_us as f64 / 1e3,
        delta.sys_time_us as f64 / 1e3,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_stats;
    use crate::periodic::{ConsumerStats, ProducerStats};
    use lvb_config::BenchConfig;

    fn empty_report() -> PeriodicReport {
        PeriodicReport {
            config: BenchConfig::default(),
            slack: 4,
            size: 6,
            elapsed_ns: 0,
            producer: ProducerStats::default(),
            consumer: ConsumerStats::default(),
            put_ns: None,
            get_ns: None,
            handoff_ns: None,
        }
    }

    #[test]
    fn stage_results_skip_empty_stages() {
        let mut report = empty_report();
        assert!(stage_results(&report).is_empty());

        report.get_ns = compute_stats(&mut [3, 1, 2]);
        report.handoff_ns = compute_stats(&mut [10]);
        let rows = stage_results(&report);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["get", "handoff"]);
        assert_eq!(rows[0].stats.p50, 2);
        assert_eq!(rows[1].unit, "ns");
    }

    #[test]
    fn refused_puts_count_as_overwritten_and_unread_as_left_in_ring() {
        let mut report = empty_report();
        report.producer.steps = 100;
        report.producer.pushed = 90;
        report.consumer.popped = 87;
        assert_eq!(
            delivery(&report),
            Delivery {
                overwritten: 10,
                left_in_ring: 3,
            }
        );
    }

    #[test]
    fn success_pct_handles_zero_total() {
        assert_eq!(success_pct(0, 0), 0.0);
        assert_eq!(success_pct(1, 4), 25.0);
    }
}
