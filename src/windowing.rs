//! Fixed-duration windowing of flows.
//!
//! A flow spanning `[t0, tN]` is cut into back-to-back half-open windows
//!
//! ```text
//! [t0 - 1, t0 - 1 + c)  [t0 - 1 + c, t0 - 1 + 2c)  ...  [s_last, s_last + c)
//! ```
//!
//! where `c` is the chunk size and `s_last` is the last window start not
//! after `tN`. Every packet falls into exactly one window. Windows with no
//! packets (gaps longer than a chunk) are still produced; the extractor skips
//! them because they carry no downlink traffic.
//!
//! Windows borrow the packet slice of their flow, so windowing never copies
//! packet data.

use crate::flow::{FlowSeries, PacketRecord, StreamingLabel};

/// One time slice of a flow.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    flow_id: &'a str,
    label: StreamingLabel,
    start: i64,
    end: i64,
    packets: &'a [PacketRecord],
}

impl<'a> Window<'a> {
    /// Build a window directly from a packet slice.
    ///
    /// Packets are expected to be time-ordered and to lie in `[start, end)`.
    pub fn new(
        flow_id: &'a str,
        label: StreamingLabel,
        start: i64,
        end: i64,
        packets: &'a [PacketRecord],
    ) -> Self {
        debug_assert!(packets.iter().all(|p| p.time >= start && p.time < end));
        Self {
            flow_id,
            label,
            start,
            end,
            packets,
        }
    }

    /// Identifier of the flow this window was cut from.
    pub fn flow_id(&self) -> &'a str {
        self.flow_id
    }

    /// Label inherited from the flow.
    pub fn label(&self) -> StreamingLabel {
        self.label
    }

    /// Inclusive start (ms).
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive end (ms).
    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn packets(&self) -> &'a [PacketRecord] {
        self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Whether `time` falls inside `[start, end)`.
    #[inline]
    pub fn contains(&self, time: i64) -> bool {
        time >= self.start && time < self.end
    }

    /// The window as a `(label, window)` pair.
    pub fn into_pair(self) -> (StreamingLabel, Window<'a>) {
        (self.label, self)
    }
}

/// Splits flows into fixed-width time windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windower {
    chunk_size_ms: i64,
}

impl Windower {
    /// Create a windower with the given chunk width in milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if `chunk_size_ms` is 0 or does not fit an `i64`.
    pub fn new(chunk_size_ms: u64) -> Self {
        assert!(chunk_size_ms > 0, "chunk_size_ms must be > 0");
        assert!(
            chunk_size_ms <= i64::MAX as u64,
            "chunk_size_ms must fit in i64"
        );
        Self {
            chunk_size_ms: chunk_size_ms as i64,
        }
    }

    pub fn chunk_size_ms(&self) -> i64 {
        self.chunk_size_ms
    }

    /// Windows of `flow`, labelled with the flow's label.
    pub fn windows<'a>(&self, flow: &'a FlowSeries) -> FlowWindows<'a> {
        self.windows_with_label(flow, flow.label())
    }

    /// Windows of `flow` carrying an explicit label.
    pub fn windows_with_label<'a>(
        &self,
        flow: &'a FlowSeries,
        label: StreamingLabel,
    ) -> FlowWindows<'a> {
        let packets = flow.packets();
        let (next_start, last_time) = match flow.time_span() {
            Some((first, last)) => (first.saturating_sub(1), last),
            // next_start > last_time: exhausted from the start
            None => (0, -1),
        };

        FlowWindows {
            flow_id: flow.id(),
            label,
            packets,
            chunk_size_ms: self.chunk_size_ms,
            next_start,
            last_time,
            cursor: 0,
        }
    }
}

/// Iterator over the windows of one flow.
///
/// Single pass: once exhausted it stays exhausted.
#[derive(Debug, Clone)]
pub struct FlowWindows<'a> {
    flow_id: &'a str,
    label: StreamingLabel,
    packets: &'a [PacketRecord],
    chunk_size_ms: i64,
    next_start: i64,
    last_time: i64,
    cursor: usize,
}

impl<'a> Iterator for FlowWindows<'a> {
    type Item = Window<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_start > self.last_time {
            return None;
        }

        let start = self.next_start;
        let end = start.saturating_add(self.chunk_size_ms);

        let remaining = &self.packets[self.cursor..];
        let count = remaining.partition_point(|p| p.time < end);
        let packets = &remaining[..count];

        self.cursor += count;
        self.next_start = end;
        if end == i64::MAX {
            // saturated, nothing can follow
            self.last_time = i64::MIN;
        }

        Some(Window::new(self.flow_id, self.label, start, end, packets))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next_start > self.last_time {
            return (0, Some(0));
        }
        let span = (self.last_time - self.next_start) as u64;
        let n = (span / self.chunk_size_ms as u64 + 1) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for FlowWindows<'_> {}
