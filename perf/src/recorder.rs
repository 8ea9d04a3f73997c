//! Per-operation sample recorder for the benchmark threads.
//!
//! Each thread owns its own recorder. Sample storage is allocated up front, so
//! recording on the hot path is a clock read and a store; once a stage's
//! buffer is full further samples are dropped.

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfStage {
    /// `Writer::put`, write plus advance.
    Put = 0,
    /// `Reader::get_with_staleness`, advance plus copy.
    Get = 1,
    /// Time from a value's `put` to the `get` that first exposed it.
    Handoff = 2,
}

pub const NUM_STAGES: usize = 3;
pub const ALL_STAGES: [PerfStage; NUM_STAGES] = [PerfStage::Put, PerfStage::Get, PerfStage::Handoff];
pub const STAGE_NAMES: [&str; NUM_STAGES] = ["put", "get", "handoff"];

/// Samples kept per stage by [`PerfRecorder::new`].
pub const DEFAULT_MAX_SAMPLES: usize = 1 << 18;

#[cfg(target_os = "macos")]
#[inline(always)]
#[allow(deprecated)]
pub fn now_ns() -> u64 {
    use std::sync::OnceLock;
    static TIMEBASE: OnceLock<(u64, u64)> = OnceLock::new();
    let (numer, denom) = *TIMEBASE.get_or_init(|| {
        let mut info = libc::mach_timebase_info_data_t { numer: 0, denom: 0 };
        let rc = unsafe { libc::mach_timebase_info(&mut info) };
        if rc != 0 || info.denom == 0 {
            (1, 1)
        } else {
            (info.numer as u64, info.denom as u64)
        }
    });
    let t = unsafe { libc::mach_absolute_time() } as u128;
    ((t * numer as u128) / denom as u128) as u64
}

/// Monotonic clock in nanoseconds, comparable across threads.
#[cfg(not(target_os = "macos"))]
#[inline(always)]
pub fn now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000_000 + ts.tv_nsec as u64
}

struct StageBuf {
    samples: Vec<u64>,
    pending: u64,
}

pub struct PerfRecorder {
    stages: [StageBuf; NUM_STAGES],
    max_samples: usize,
}

impl PerfRecorder {
    pub fn new() -> Self {
        Self::with_max_samples(DEFAULT_MAX_SAMPLES)
    }

    pub fn with_max_samples(max_samples: usize) -> Self {
        Self {
            stages: std::array::from_fn(|_| StageBuf {
                samples: Vec::with_capacity(max_samples),
                pending: 0,
            }),
            max_samples,
        }
    }

    #[inline(always)]
    pub fn begin(&mut self, stage: PerfStage) {
        self.stages[stage as usize].pending = now_ns();
    }

    #[inline(always)]
    pub fn end(&mut self, stage: PerfStage) {
        let elapsed = now_ns().saturating_sub(self.stages[stage as usize].pending);
        self.record(stage, elapsed);
    }

    #[inline(always)]
    pub fn record(&mut self, stage: PerfStage, duration_ns: u64) {
        let buf = &mut self.stages[stage as usize];
        if buf.samples.len() < self.max_samples {
            buf.samples.push(duration_ns);
        }
    }

    pub fn samples(&self, stage: PerfStage) -> &[u64] {
        &self.stages[stage as usize].samples
    }

    pub fn count(&self, stage: PerfStage) -> usize {
        self.stages[stage as usize].samples.len()
    }

    /// Appends another recorder's samples, up to this recorder's limit.
    pub fn merge(&mut self, other: &PerfRecorder) {
        for stage in ALL_STAGES {
            for &s in other.samples(stage) {
                self.record(stage, s);
            }
        }
    }
}

impl Default for PerfRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
        assert!(a > 0);
    }

    #[test]
    fn begin_end_records_elapsed() {
        let mut rec = PerfRecorder::with_max_samples(4);
        rec.begin(PerfStage::Put);
        std::thread::sleep(std::time::Duration::from_millis(1));
        rec.end(PerfStage::Put);
        assert_eq!(rec.count(PerfStage::Put), 1);
        assert!(rec.samples(PerfStage::Put)[0] >= 1_000_000);
        assert_eq!(rec.count(PerfStage::Get), 0);
    }

    #[test]
    fn full_stage_drops_samples() {
        let mut rec = PerfRecorder::with_max_samples(2);
        for v in 0..5 {
            rec.record(PerfStage::Handoff, v);
        }
        assert_eq!(rec.samples(PerfStage::Handoff), &[0, 1]);
        assert_eq!(rec.count(PerfStage::Handoff), 2);
    }

    #[test]
    fn merge_appends_per_stage() {
        let mut a = PerfRecorder::with_max_samples(8);
        let mut b = PerfRecorder::with_max_samples(8);
        a.record(PerfStage::Put, 1);
        b.record(PerfStage::Get, 2);
        b.record(PerfStage::Handoff, 3);
        a.merge(&b);
        assert_eq!(a.samples(PerfStage::Put), &[1]);
        assert_eq!(a.samples(PerfStage::Get), &[2]);
        assert_eq!(a.samples(PerfStage::Handoff), &[3]);
    }
}
