//! Run the game server under flood experiment and print the quality of
//! service of the legitimate clients.
//!
//! ```bash
//! floodsim --num-attackers 10 --sim-time 60s --bottleneck-rate 10Mbps
//! RUST_LOG=floodsim_core=debug floodsim --num-attackers 0 --sim-time 5s
//! ```

use anyhow::{Context as _, Result};
use clap::Parser;
use floodsim_core::{
    Aggregate, Bandwidth, GameDdosScenario, Latency, PacketLoss, QueueLimit, SimTime,
    qos::{FlowReport, MeanMetrics},
    scenario::ScenarioOutcome,
    stats::LinkStats,
};
use std::{process::ExitCode, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "floodsim", version, about, long_about = None)]
struct Command {
    /// number of game clients
    #[arg(long, default_value_t = 5)]
    num_clients: usize,

    /// number of flooding hosts
    #[arg(long, default_value_t = 10)]
    num_attackers: usize,

    /// end of the run, every application stops with it
    #[arg(long, default_value = "60s")]
    sim_time: SimTime,

    #[arg(long, default_value = "10Mbps")]
    bottleneck_rate: Bandwidth,

    #[arg(long, default_value = "10ms")]
    bottleneck_delay: Latency,

    /// random loss on the bottleneck, on top of the congestion losses
    #[arg(long, default_value = "0%")]
    bottleneck_loss: PacketLoss,

    /// drop-tail limit of every link queue (`100p`, `64KB`, ...)
    #[arg(long, default_value = "100p")]
    queue: QueueLimit,

    /// data rate of each attacker while it is on
    #[arg(long, default_value = "50Mbps")]
    attack_rate: Bandwidth,

    /// when the flood starts
    #[arg(long, default_value = "5s")]
    attack_start: SimTime,

    #[arg(long, default_value_t = floodsim_core::defaults::DEFAULT_SEED)]
    seed: u64,

    /// also print the counters of every directed link
    #[arg(long)]
    link_stats: bool,
}

impl Command {
    fn scenario(&self) -> GameDdosScenario {
        let defaults = GameDdosScenario::default();
        GameDdosScenario {
            num_clients: self.num_clients,
            num_attackers: self.num_attackers,
            sim_time: self.sim_time,
            access: defaults.access.set_queue_limit(self.queue),
            bottleneck: defaults
                .bottleneck
                .set_bandwidth(self.bottleneck_rate)
                .set_latency(self.bottleneck_delay)
                .set_packet_loss(self.bottleneck_loss)
                .set_queue_limit(self.queue),
            attack_rate: self.attack_rate,
            attack_start: self.attack_start,
            seed: self.seed,
            ..defaults
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = Command::parse();
    let scenario = cmd.scenario();

    let outcome = scenario
        .run()
        .context("Failed to run the game flood scenario")?;

    info!(
        events = outcome.summary.events,
        sent = outcome.summary.packets_sent,
        delivered = outcome.summary.packets_delivered,
        dropped = outcome.summary.packets_dropped,
        "run completed"
    );

    let code = print_report(&scenario, &outcome);
    if cmd.link_stats {
        print_links(&outcome.links);
    }
    Ok(code)
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1_000.0
}

fn print_report(scenario: &GameDdosScenario, outcome: &ScenarioOutcome) -> ExitCode {
    println!();
    println!("=== Gaming QoS Results (Legitimate Clients Only) ===");
    println!(
        "Simulation Time: {} (Attack: {}-{})",
        scenario.sim_time, scenario.attack_start, scenario.sim_time
    );
    println!();

    match outcome.report.aggregate {
        Aggregate::NoFlowsObserved => {
            println!("ERROR: No flows detected! Check network configuration.");
            ExitCode::FAILURE
        }
        Aggregate::NoLegitimateFlows => {
            println!("ERROR: No legitimate client flows found!");
            ExitCode::SUCCESS
        }
        Aggregate::Mean(mean) => {
            for flow in &outcome.report.flows {
                print_flow(flow);
            }
            print_mean(&mean);
            ExitCode::SUCCESS
        }
    }
}

fn print_flow(flow: &FlowReport) {
    let metrics = &flow.metrics;
    println!("Flow ID: {}", flow.id);
    println!("  Source: {} -> {}", flow.key.src.ip(), flow.key.dst.ip());
    println!("  Throughput: {:.6} Mbps", metrics.throughput_mbps());
    println!("  Avg Delay: {:.3} ms", ms(metrics.avg_delay));
    println!("  Avg Jitter: {:.3} ms", ms(metrics.avg_jitter));
    println!("  Packet Loss: {:.2}%", metrics.loss_ratio * 100.0);
    println!(
        "  Tx Packets: {}, Rx Packets: {}, Lost: {}",
        flow.tx_packets, flow.rx_packets, flow.dropped_packets
    );
    println!();
}

fn print_mean(mean: &MeanMetrics) {
    println!(
        "=== Aggregate Metrics (Average across {} clients) ===",
        mean.flows
    );
    println!("Avg Throughput: {:.6} Mbps", mean.throughput_mbps());
    println!("Avg Delay: {:.3} ms", ms(mean.avg_delay));
    println!("Avg Jitter: {:.3} ms", ms(mean.avg_jitter));
    println!("Avg Packet Loss: {:.2}%", mean.loss_ratio * 100.0);
}

fn print_links(links: &[LinkStats]) {
    println!();
    println!("=== Links ===");
    for link in links {
        println!(
            "{} {} -> {} ({}, {}, {}): forwarded {} packets, {} bytes, overflow {}, random loss {}, peak {} packets",
            link.id,
            link.from,
            link.to,
            link.bandwidth,
            link.latency,
            link.queue_limit,
            link.forwarded_packets,
            link.forwarded_bytes,
            link.overflow_drops,
            link.random_drops,
            link.peak_packets,
        );
    }
}
