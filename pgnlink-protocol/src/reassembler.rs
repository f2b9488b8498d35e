//! Stream reassembler
//!
//! Turns an arbitrarily chunked byte feed into validated frames. The
//! receive buffer is bounded: bytes that never become a frame are dropped
//! once the buffer comes within `overflow_margin` bytes of its capacity. A
//! trailing lone marker byte or announcement prefix survives the reset.
//!
//! Each push appends the new bytes and then scans the buffer left to right
//! for the marker pair (and, when configured, the presence announcement):
//!
//! - a valid frame is emitted and its bytes, together with any noise before
//!   it, are removed
//! - an incomplete frame stops the scan until more bytes arrive; noise
//!   ahead of it is removed
//! - a checksum or length failure removes only up to that marker byte, so
//!   valid frames buffered behind a false marker survive

use heapless::Vec;

use crate::frame::{self, Frame, FrameError, MARKER, MIN_FRAME_SIZE};
use crate::hello::Announcement;

/// Default receive buffer capacity in bytes
pub const RX_BUFFER_CAPACITY: usize = 512;

/// Default distance from capacity at which an unproductive buffer is reset
pub const OVERFLOW_MARGIN: usize = 100;

/// Item produced by the reassembler, in stream order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Received {
    /// A checksum-valid frame
    Frame(Frame),
    /// The configured presence announcement literal
    Announcement,
}

/// Lifetime counters (saturating)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReassemblerStats {
    /// Frames emitted
    pub frames: u32,
    /// Candidate positions rejected by checksum or length
    pub checksum_errors: u32,
    /// Buffer resets
    pub overflows: u32,
    /// Bytes dropped as noise or by resets
    pub discarded_bytes: u32,
    /// Announcements recognised
    pub announcements: u32,
}

/// What a single [`Reassembler::push`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PushSummary {
    /// Frames emitted
    pub frames: usize,
    /// Announcements emitted
    pub announcements: usize,
    /// Candidates rejected by checksum or length
    pub checksum_errors: usize,
    /// Buffer was reset at least once
    pub overflowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Marker(usize),
    Announcement(usize),
}

/// Bounded, resynchronising frame reassembler
#[derive(Debug, Clone)]
pub struct Reassembler<const N: usize = RX_BUFFER_CAPACITY> {
    buffer: Vec<u8, N>,
    overflow_margin: usize,
    announcement: Option<Announcement>,
    stats: ReassemblerStats,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a reassembler with the default 512-byte buffer and 100-byte margin
    pub fn new() -> Self {
        Self::with_margin(OVERFLOW_MARGIN)
    }
}

impl<const N: usize> Reassembler<N> {
    /// Create a reassembler that resets once more than `N - margin` bytes are
    /// buffered without producing anything
    pub fn with_margin(margin: usize) -> Self {
        Self {
            buffer: Vec::new(),
            overflow_margin: margin.min(N),
            announcement: None,
            stats: ReassemblerStats::default(),
        }
    }

    /// Also recognise `announcement` in the stream
    pub fn with_announcement(mut self, announcement: Announcement) -> Self {
        self.announcement = Some(announcement);
        self
    }

    /// Replace or remove the announcement literal to recognise
    pub fn set_announcement(&mut self, announcement: Option<Announcement>) {
        self.announcement = announcement;
    }

    /// Buffer capacity in bytes
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of bytes currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes currently awaiting classification
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Lifetime counters
    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.stats.discarded_bytes = self
            .stats
            .discarded_bytes
            .saturating_add(self.buffer.len() as u32);
        self.buffer.clear();
    }

    /// Append `data` and hand every completed item to `sink`, in order
    pub fn push<F>(&mut self, mut data: &[u8], mut sink: F) -> PushSummary
    where
        F: FnMut(Received),
    {
        let mut summary = PushSummary::default();

        while !data.is_empty() {
            let take = (N - self.buffer.len()).min(data.len());
            // Cannot fail: `take` never exceeds the free space
            let _ = self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            let produced = self.extract(&mut sink, &mut summary);
            if !produced && self.over_threshold() {
                self.reset();
                self.stats.overflows = self.stats.overflows.saturating_add(1);
                summary.overflowed = true;
            }
        }

        summary
    }

    /// Scan the buffer and emit everything complete. Returns true if
    /// anything was emitted.
    fn extract<F>(&mut self, sink: &mut F, summary: &mut PushSummary) -> bool
    where
        F: FnMut(Received),
    {
        let mut produced = false;

        while self.buffer.len() >= MIN_FRAME_SIZE {
            let Some(candidate) = self.find_candidate() else {
                break;
            };

            match candidate {
                Candidate::Marker(i) => match frame::try_parse(&self.buffer, i) {
                    Ok((frame, consumed)) => {
                        self.consume(i, i + consumed);
                        self.stats.frames = self.stats.frames.saturating_add(1);
                        summary.frames += 1;
                        produced = true;
                        sink(Received::Frame(frame));
                    }
                    Err(FrameError::Incomplete) => {
                        self.consume(i, i);
                        break;
                    }
                    Err(_) => {
                        self.stats.checksum_errors = self.stats.checksum_errors.saturating_add(1);
                        summary.checksum_errors += 1;
                        self.consume(i + 1, i + 1);
                    }
                },
                Candidate::Announcement(i) => {
                    let len = self.announcement.as_ref().map_or(0, Announcement::len);
                    self.consume(i, i + len);
                    self.stats.announcements = self.stats.announcements.saturating_add(1);
                    summary.announcements += 1;
                    produced = true;
                    sink(Received::Announcement);
                }
            }
        }

        produced
    }

    /// First marker pair or complete announcement in the buffer
    fn find_candidate(&self) -> Option<Candidate> {
        let hello = self.announcement.as_ref().map(Announcement::as_bytes);

        (0..self.buffer.len()).find_map(|i| {
            let rest = &self.buffer[i..];
            if rest.starts_with(&MARKER) {
                Some(Candidate::Marker(i))
            } else if hello.is_some_and(|h| rest.starts_with(h)) {
                Some(Candidate::Announcement(i))
            } else {
                None
            }
        })
    }

    /// Remove `[0, end)`; bytes before `item_start` count as noise
    fn consume(&mut self, item_start: usize, end: usize) {
        self.stats.discarded_bytes = self
            .stats
            .discarded_bytes
            .saturating_add(item_start as u32);

        let remaining = self.buffer.len() - end;
        self.buffer.copy_within(end.., 0);
        self.buffer.truncate(remaining);
    }

    /// Overflow reset: drop everything except a tail that may start an item
    fn reset(&mut self) {
        let end = self.buffer.len() - self.partial_tail_len();
        self.consume(end, end);
    }

    /// Length of a trailing first marker byte or announcement prefix
    fn partial_tail_len(&self) -> usize {
        let marker = usize::from(self.buffer.last() == Some(&MARKER[0]));
        let hello = self.announcement.as_ref().map_or(0, |a| {
            let h = a.as_bytes();
            (1..h.len().min(self.buffer.len() + 1))
                .rev()
                .find(|&k| self.buffer.ends_with(&h[..k]))
                .unwrap_or(0)
        });
        marker.max(hello)
    }

    fn over_threshold(&self) -> bool {
        self.buffer.len() > N - self.overflow_margin || self.buffer.is_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hello::announcement;

    type Collected = Vec<Received, 16>;

    fn encode(source: u8, pgn: u8, payload: &[u8]) -> Vec<u8, { frame::MAX_FRAME_SIZE }> {
        Frame::new(source, pgn, payload)
            .unwrap()
            .encode_to_vec()
            .unwrap()
    }

    fn push_all<const N: usize>(r: &mut Reassembler<N>, data: &[u8], out: &mut Collected) {
        r.push(data, |item| out.push(item).unwrap());
    }

    fn frame_of(item: &Received) -> &Frame {
        match item {
            Received::Frame(frame) => frame,
            Received::Announcement => panic!("expected a frame"),
        }
    }

    #[test]
    fn test_single_frame() {
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        let summary = r.push(&encode(0x7F, 0xFE, &[1, 2, 3]), |item| {
            out.push(item).unwrap()
        });

        assert_eq!(summary.frames, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(frame_of(&out[0]).pgn, 0xFE);
        assert!(r.is_empty());
    }

    #[test]
    fn test_minimum_frame_needs_no_extra_byte() {
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        push_all(&mut r, &encode(0x7F, 0xEE, &[]), &mut out);

        assert_eq!(out.len(), 1);
        assert!(frame_of(&out[0]).payload.is_empty());
    }

    #[test]
    fn test_two_frames_one_push() {
        let mut data = encode(0x7F, 0xFC, &[1]);
        data.extend_from_slice(&encode(0x7F, 0xFD, &[2, 2])).unwrap();

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(frame_of(&out[0]).pgn, 0xFC);
        assert_eq!(frame_of(&out[1]).pgn, 0xFD);
    }

    #[test]
    fn test_byte_at_a_time() {
        let data = encode(0x50, 0xFA, &[1, 0, 0, 0, 0, 0, 0, 0]);
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        for (i, byte) in data.iter().enumerate() {
            push_all(&mut r, core::slice::from_ref(byte), &mut out);
            let expected = if i + 1 == data.len() { 1 } else { 0 };
            assert_eq!(out.len(), expected);
        }

        assert_eq!(frame_of(&out[0]).source, 0x50);
    }

    #[test]
    fn test_garbage_prefix_is_discarded() {
        let mut data: Vec<u8, 64> = Vec::new();
        data.extend_from_slice(&[0x00, 0xFF, 0x12, 0x80, 0x34]).unwrap();
        data.extend_from_slice(&encode(0x7E, 0xFD, &[7])).unwrap();

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(r.stats().discarded_bytes, 5);
    }

    #[test]
    fn test_resync_after_corrupted_frame() {
        let a = encode(0x7F, 0xFC, &[1, 2, 3]);
        let mut corrupt = encode(0x7F, 0xFD, &[4, 5, 6]);
        corrupt[6] ^= 0x01;
        let b = encode(0x7F, 0xFE, &[7, 8, 9]);

        let mut data: Vec<u8, 64> = Vec::new();
        data.extend_from_slice(&a).unwrap();
        data.extend_from_slice(&corrupt).unwrap();
        data.extend_from_slice(&b).unwrap();

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(frame_of(&out[0]).pgn, 0xFC);
        assert_eq!(frame_of(&out[1]).pgn, 0xFE);
        assert_eq!(r.stats().checksum_errors, 1);
    }

    #[test]
    fn test_rejected_marker_counted_once() {
        let mut corrupt = encode(0x7F, 0xFD, &[4, 5, 6]);
        corrupt[8] ^= 0xFF;

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &corrupt, &mut out);
        assert_eq!(r.stats().checksum_errors, 1);
        assert_eq!(r.len(), corrupt.len() - 1);

        push_all(&mut r, &encode(0x7F, 0xFE, &[1]), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(r.stats().checksum_errors, 1);
        assert!(r.is_empty());
    }

    #[test]
    fn test_noise_before_partial_frame_is_dropped() {
        let data = encode(0x7F, 0xFE, &[1, 2, 3, 4]);
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        push_all(&mut r, &[0x01, 0x02, 0x03], &mut out);
        push_all(&mut r, &data[..6], &mut out);
        assert_eq!(r.len(), 6);
        assert_eq!(r.stats().discarded_bytes, 3);

        push_all(&mut r, &data[6..], &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_false_marker_before_real_frame() {
        // False marker claiming a 2-byte payload, followed by a real frame
        let mut data: Vec<u8, 64> = Vec::new();
        data.extend_from_slice(&[0x80, 0x81, 0x01, 0x02, 0x02]).unwrap();
        data.extend_from_slice(&encode(0x7F, 0xEF, &[3, 4])).unwrap();

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(frame_of(&out[0]).pgn, 0xEF);
        assert_eq!(&frame_of(&out[0]).payload[..], &[3, 4]);
    }

    #[test]
    fn test_marker_in_payload_does_not_split() {
        let mut data = encode(0x7F, 0xFE, &[0x80, 0x81, 0x00, 0x00, 0x00, 0x80, 0x81]);
        data.extend_from_slice(&encode(0x7F, 0xFD, &[0x42])).unwrap();

        let mut r = Reassembler::new();
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(frame_of(&out[0]).payload.len(), 7);
        assert_eq!(&frame_of(&out[1]).payload[..], &[0x42]);
        assert_eq!(r.stats().checksum_errors, 0);
    }

    #[test]
    fn test_incomplete_waits() {
        let data = encode(0x7F, 0xFE, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        push_all(&mut r, &data[..9], &mut out);
        assert!(out.is_empty());
        assert_eq!(r.len(), 9);

        push_all(&mut r, &data[9..], &mut out);
        assert_eq!(out.len(), 1);
        assert!(r.is_empty());
    }

    #[test]
    fn test_overflow_bounds_memory() {
        let mut r = Reassembler::new();
        let noise = [0x55u8; 64];

        let mut overflowed = false;
        for _ in 0..100 {
            let summary = r.push(&noise, |_| panic!("noise produced an item"));
            overflowed |= summary.overflowed;
            assert!(r.len() <= RX_BUFFER_CAPACITY - OVERFLOW_MARGIN);
        }

        assert!(overflowed);
        assert!(r.stats().overflows > 0);

        let mut out = Collected::new();
        push_all(&mut r, &encode(0x7F, 0xFE, &[1]), &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_reset_keeps_trailing_marker_byte() {
        let data = encode(0x7F, 0xFE, &[1, 2]);
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        push_all(&mut r, &[0x55; RX_BUFFER_CAPACITY - OVERFLOW_MARGIN], &mut out);
        assert_eq!(r.stats().overflows, 0);

        push_all(&mut r, &data[..1], &mut out);
        assert_eq!(r.stats().overflows, 1);
        assert_eq!(r.buffered(), &[0x80]);
        assert_eq!(r.stats().discarded_bytes, 412);

        push_all(&mut r, &data[1..], &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(&frame_of(&out[0]).payload[..], &[1, 2]);
    }

    #[test]
    fn test_reset_keeps_announcement_prefix() {
        let hello = announcement("ESP32").unwrap();
        let mut r = Reassembler::new().with_announcement(hello);
        let mut out = Collected::new();

        push_all(&mut r, &[0x55; RX_BUFFER_CAPACITY - OVERFLOW_MARGIN], &mut out);
        push_all(&mut r, b"ESP", &mut out);
        assert_eq!(r.stats().overflows, 1);
        assert_eq!(r.buffered(), b"ESP");

        push_all(&mut r, b"32-hello", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], Received::Announcement);
    }

    #[test]
    fn test_oversized_push_is_chunked() {
        let mut data: Vec<u8, 1024> = Vec::new();
        data.extend_from_slice(&[0x11; 900]).unwrap();
        data.extend_from_slice(&encode(0x7F, 0xFC, &[5])).unwrap();

        let mut r: Reassembler<64> = Reassembler::with_margin(16);
        let mut out = Collected::new();
        let summary = r.push(&data, |item| out.push(item).unwrap());

        assert!(summary.overflowed);
        assert_eq!(out.len(), 1);
        assert!(r.len() <= 64);
    }

    #[test]
    fn test_announcement_in_stream_order() {
        let hello = announcement("ESP32").unwrap();
        let mut data: Vec<u8, 64> = Vec::new();
        data.extend_from_slice(&encode(0x7F, 0xFC, &[1])).unwrap();
        data.extend_from_slice(b"ESP32-hello").unwrap();
        data.extend_from_slice(&encode(0x7F, 0xFD, &[2])).unwrap();

        let mut r = Reassembler::new().with_announcement(hello);
        let mut out = Collected::new();
        push_all(&mut r, &data, &mut out);

        assert_eq!(out.len(), 3);
        assert_eq!(frame_of(&out[0]).pgn, 0xFC);
        assert_eq!(out[1], Received::Announcement);
        assert_eq!(frame_of(&out[2]).pgn, 0xFD);
        assert_eq!(r.stats().announcements, 1);
        assert!(r.is_empty());
    }

    #[test]
    fn test_split_announcement() {
        let hello = announcement("ESP32").unwrap();
        let mut r = Reassembler::new().with_announcement(hello);
        let mut out = Collected::new();

        push_all(&mut r, b"ESP3", &mut out);
        push_all(&mut r, b"2-he", &mut out);
        assert!(out.is_empty());
        push_all(&mut r, b"llo", &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], Received::Announcement);
    }

    #[test]
    fn test_announcement_ignored_when_not_configured() {
        let mut r = Reassembler::new();
        let mut out = Collected::new();

        push_all(&mut r, b"ESP32-hello", &mut out);
        push_all(&mut r, &encode(0x7F, 0xFC, &[1]), &mut out);

        assert_eq!(out.len(), 1);
        assert_eq!(r.stats().discarded_bytes, 11);
    }
}
