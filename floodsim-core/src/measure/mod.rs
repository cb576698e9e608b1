//! Physical quantities used to describe links and traffic sources.

mod bandwidth;
mod latency;
mod packet_loss;
mod queue_limit;

pub use self::{
    bandwidth::Bandwidth,
    latency::Latency,
    packet_loss::{PacketLoss, PacketLossParseError, PacketLossRate, PacketLossRateError},
    queue_limit::QueueLimit,
};
use rand_core::Rng;

/// Draw a uniform sample in `[0.0, 1.0)`.
pub(crate) fn unit_sample<R: Rng>(rng: &mut R) -> f64 {
    // keep the 53 most significant bits, the precision of an f64 mantissa
    let bits = rng.next_u64() >> 11;
    bits as f64 * (1.0 / (1u64 << 53) as f64)
}
