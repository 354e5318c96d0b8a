//! Per-direction volume and size-class statistics.

use crate::flow::{Direction, PacketRecord};

/// Byte/packet counters for one direction of a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionStats {
    pub bytes: u64,
    pub packets: u64,
    /// Packets strictly above the large threshold
    pub large: u64,
    /// Packets strictly below the small threshold
    pub small: u64,
}

impl DirectionStats {
    /// Mean packet size, NaN when the direction has no packets.
    pub fn mean_size(&self) -> f64 {
        if self.packets == 0 {
            f64::NAN
        } else {
            self.bytes as f64 / self.packets as f64
        }
    }

    /// Share of large packets in this direction, 0 without packets.
    pub fn large_prop(&self) -> f64 {
        proportion(self.large, self.packets)
    }

    /// Share of small packets in this direction, 0 without packets.
    pub fn small_prop(&self) -> f64 {
        proportion(self.small, self.packets)
    }
}

#[inline]
fn proportion(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Traffic counters of a window, split by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub sent: DirectionStats,
    pub received: DirectionStats,
}

impl TrafficStats {
    /// Count `packets` with the given size-class thresholds (bytes).
    pub fn collect(packets: &[PacketRecord], large_threshold: u64, small_threshold: u64) -> Self {
        let mut stats = Self::default();
        for packet in packets {
            let side = match packet.dir {
                Direction::Sent => &mut stats.sent,
                Direction::Received => &mut stats.received,
            };
            side.bytes += packet.size;
            side.packets += 1;
            if packet.size > large_threshold {
                side.large += 1;
            }
            if packet.size < small_threshold {
                side.small += 1;
            }
        }
        stats
    }

    /// No downlink traffic: nothing meaningful can be derived.
    pub fn is_degenerate(&self) -> bool {
        self.received.bytes == 0 || self.received.packets == 0
    }

    /// `sent_bytes / received_bytes`.
    pub fn bytes_ratio(&self) -> f64 {
        self.sent.bytes as f64 / self.received.bytes as f64
    }

    /// `sent_packets / received_packets`.
    pub fn count_ratio(&self) -> f64 {
        self.sent.packets as f64 / self.received.packets as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkt(size: u64, dir: Direction) -> PacketRecord {
        PacketRecord::new(0, size, dir)
    }

    #[test]
    fn test_collect_counts_by_direction() {
        let packets = [
            pkt(100, Direction::Sent),
            pkt(1500, Direction::Received),
            pkt(1300, Direction::Received),
            pkt(600, Direction::Received),
        ];
        let stats = TrafficStats::collect(&packets, 1200, 200);

        assert_eq!(stats.sent.bytes, 100);
        assert_eq!(stats.sent.small, 1);
        assert_eq!(stats.received.packets, 3);
        assert_eq!(stats.received.large, 2);
        assert_eq!(stats.received.large_prop(), 2.0 / 3.0);
        assert_eq!(stats.received.small_prop(), 0.0);
        assert_eq!(stats.count_ratio(), 1.0 / 3.0);
        assert!(!stats.is_degenerate());
    }

    #[test]
    fn test_thresholds_are_strict() {
        let packets = [pkt(1200, Direction::Received), pkt(200, Direction::Received)];
        let stats = TrafficStats::collect(&packets, 1200, 200);
        assert_eq!(stats.received.large, 0);
        assert_eq!(stats.received.small, 0);
    }

    #[test]
    fn test_empty_direction() {
        let stats = TrafficStats::collect(&[pkt(500, Direction::Received)], 1200, 200);
        assert!(stats.sent.mean_size().is_nan());
        assert_eq!(stats.sent.large_prop(), 0.0);
        assert_eq!(stats.sent.small_prop(), 0.0);
        assert_eq!(stats.bytes_ratio(), 0.0);
    }

    #[test]
    fn test_degenerate_without_downlink() {
        let stats = TrafficStats::collect(&[pkt(500, Direction::Sent)], 1200, 200);
        assert!(stats.is_degenerate());

        let zero_bytes = TrafficStats::collect(&[pkt(0, Direction::Received)], 1200, 200);
        assert!(zero_bytes.is_degenerate());
    }
}
