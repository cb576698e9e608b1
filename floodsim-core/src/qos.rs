//! Derived quality of service metrics.
//!
//! Nothing here is stored during the run: the metrics are computed from
//! the raw [`FlowStats`] counters when a report is requested.

use crate::flow::{Flow, FlowClass, FlowId, FlowKey, FlowStats};
use std::time::Duration;

/// How to compute the throughput of a flow whose arrivals do not span any
/// time (a single received packet, or none).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationFallback {
    /// always use this duration
    Fixed(Duration),
    /// use the time between the first and the last packet sent on the
    /// flow
    SendSpan,
}

/// Policy knobs of the metric derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QosPolicy {
    pub fallback: DurationFallback,
}

/// The metrics of one flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowMetrics {
    /// received bits per second
    pub throughput_bps: f64,
    pub avg_delay: Duration,
    pub avg_jitter: Duration,
    /// dropped packets over sent packets, in `[0, 1]`
    pub loss_ratio: f64,
}

/// Everything reported about one flow.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowReport {
    pub id: FlowId,
    pub key: FlowKey,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub dropped_packets: u64,
    pub metrics: FlowMetrics,
}

/// Arithmetic mean of each metric over the legitimate flows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanMetrics {
    /// number of flows the mean is computed over
    pub flows: usize,
    pub throughput_bps: f64,
    pub avg_delay: Duration,
    pub avg_jitter: Duration,
    pub loss_ratio: f64,
}

/// The cross flow summary. The two empty cases are distinct outcomes,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    /// no flow at all was observed during the run
    NoFlowsObserved,
    /// flows were observed but none of them is legitimate
    NoLegitimateFlows,
    Mean(MeanMetrics),
}

/// The outcome of a run, restricted to legitimate flows.
#[derive(Debug, Clone, PartialEq)]
pub struct QosReport {
    /// number of flows of any class observed during the run
    pub observed_flows: usize,
    /// legitimate flows, in [`FlowId`] order
    pub flows: Vec<FlowReport>,
    pub aggregate: Aggregate,
}

impl QosPolicy {
    pub fn new(fallback: DurationFallback) -> Self {
        Self { fallback }
    }

    fn fallback_duration(&self, stats: &FlowStats) -> Duration {
        match self.fallback {
            DurationFallback::Fixed(duration) => duration,
            DurationFallback::SendSpan => match (stats.first_tx, stats.last_tx) {
                (Some(first), Some(last)) => last.saturating_duration_since(first),
                _ => Duration::ZERO,
            },
        }
    }
}

impl Default for QosPolicy {
    fn default() -> Self {
        Self::new(DurationFallback::SendSpan)
    }
}

impl FlowMetrics {
    pub fn compute(stats: &FlowStats, policy: &QosPolicy) -> Self {
        let measured = match (stats.first_rx, stats.last_rx) {
            (Some(first), Some(last)) => last.saturating_duration_since(first),
            _ => Duration::ZERO,
        };
        let duration = if measured.is_zero() {
            policy.fallback_duration(stats)
        } else {
            measured
        };

        let throughput_bps = if duration.is_zero() {
            0.0
        } else {
            (stats.rx_bytes as f64 * 8.0) / duration.as_secs_f64()
        };

        let avg_delay = match stats.rx_packets {
            0 => Duration::ZERO,
            n => div_duration(stats.delay_sum, n),
        };

        let avg_jitter = match stats.rx_packets {
            0 | 1 => Duration::ZERO,
            n => div_duration(stats.jitter_sum, n - 1),
        };

        let loss_ratio = match stats.tx_packets {
            0 => 0.0,
            n => stats.dropped_packets() as f64 / n as f64,
        };

        Self {
            throughput_bps,
            avg_delay,
            avg_jitter,
            loss_ratio,
        }
    }

    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_bps / 1_000_000.0
    }
}

impl MeanMetrics {
    pub fn throughput_mbps(&self) -> f64 {
        self.throughput_bps / 1_000_000.0
    }
}

impl FlowReport {
    fn new(flow: &Flow, policy: &QosPolicy) -> Self {
        let stats = flow.stats();
        Self {
            id: flow.id(),
            key: *flow.key(),
            tx_packets: stats.tx_packets,
            rx_packets: stats.rx_packets,
            dropped_packets: stats.dropped_packets(),
            metrics: FlowMetrics::compute(stats, policy),
        }
    }
}

impl QosReport {
    /// Derive the report of `flows`, keeping only the legitimate ones.
    pub fn new<'a>(flows: impl IntoIterator<Item = &'a Flow>, policy: &QosPolicy) -> Self {
        let mut observed_flows = 0;
        let mut reports = Vec::new();

        for flow in flows {
            observed_flows += 1;
            if flow.class() == FlowClass::Legitimate {
                reports.push(FlowReport::new(flow, policy));
            }
        }

        let aggregate = if observed_flows == 0 {
            Aggregate::NoFlowsObserved
        } else {
            Self::mean(&reports)
                .map(Aggregate::Mean)
                .unwrap_or(Aggregate::NoLegitimateFlows)
        };

        Self {
            observed_flows,
            flows: reports,
            aggregate,
        }
    }

    fn mean(reports: &[FlowReport]) -> Option<MeanMetrics> {
        let active: Vec<&FlowMetrics> = reports
            .iter()
            .filter(|report| report.tx_packets > 0)
            .map(|report| &report.metrics)
            .collect();

        if active.is_empty() {
            return None;
        }
        let n = active.len();

        let mut throughput = 0.0;
        let mut loss = 0.0;
        let mut delay = Duration::ZERO;
        let mut jitter = Duration::ZERO;
        for metrics in &active {
            throughput += metrics.throughput_bps;
            loss += metrics.loss_ratio;
            delay += metrics.avg_delay;
            jitter += metrics.avg_jitter;
        }

        Some(MeanMetrics {
            flows: n,
            throughput_bps: throughput / n as f64,
            avg_delay: div_duration(delay, n as u64),
            avg_jitter: div_duration(jitter, n as u64),
            loss_ratio: loss / n as f64,
        })
    }
}

fn div_duration(total: Duration, n: u64) -> Duration {
    Duration::from_nanos((total.as_nanos() / n as u128).min(u64::MAX as u128) as u64)
}
