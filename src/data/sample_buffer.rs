//! Double-buffered, bounded sample store for a single channel.
//!
//! A `SampleBuffer` owns two fixed-capacity slots. One is the write target
//! ("active"), the other is the read-safe side ("standby"). The producer only ever
//! touches the active slot; consumers only ever read the standby slot through a
//! registered [`StandbyView`].
//!
//! # Swap discipline
//!
//! ```text
//!            append()                        view() / range_query()
//!               |                                     |
//!               v                                     v
//!   slots[active]  <-- swap(): flip `active` -->  slots[1 - active]
//!               ^                                     |
//!               +----- replay (<= capacity) ----------+
//! ```
//!
//! `swap()` is a single index flip. It is refused with [`SwapOutcome::Deferred`]
//! while any view is still registered on the standby slot (that slot would become
//! the next write target), and reported as [`SwapOutcome::Current`] when nothing was
//! appended since the previous flip.
//!
//! After a flip the new active slot lags the standby slot by the samples written
//! since the previous flip. The producer copies them over from the standby slot on
//! its next append, holding only a shared lock on the standby side, so readers are
//! never blocked by the producer. Memory per channel is two slots of `capacity`
//! samples and never grows with stream length.
//!
//! # Restarting a stream
//!
//! [`SampleBuffer::clear`] forgets every sample and the last accepted timestamp so
//! a restarted acquisition can begin again from `t = 0`. The standby slot is only
//! emptied once no view holds it; until then it is marked stale and dropped on the
//! next successful swap.

use crate::data::sample::Sample;
use crate::error::{AppResult, DaqError};
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Largest accepted per-slot capacity (samples).
pub const MAX_CAPACITY: usize = 1 << 22;

/// Result of a [`SampleBuffer::swap`] request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The slots exchanged roles; the standby side now holds every appended sample.
    Swapped,
    /// A reader still holds the standby slot; it keeps its previous contents.
    Deferred,
    /// Nothing was appended since the last flip; the standby side is already current.
    Current,
}

/// Producer-side bookkeeping. Guarded by a mutex that readers never take.
#[derive(Debug, Default)]
struct WriterState {
    /// Timestamp of the most recently accepted sample
    last_timestamp: Option<f64>,
    /// Logical number of buffered samples (what the standby side holds after a swap)
    len: usize,
    /// Samples in the active slot that the standby slot does not hold yet
    pending: usize,
    /// Samples the active slot must still copy from the standby slot
    replay: usize,
    /// Standby slot predates a `clear()` and must be emptied on the next flip
    stale_standby: bool,
}

struct SampleBufferInner {
    slots: [RwLock<VecDeque<Sample>>; 2],
    /// Index of the slot currently receiving writes. Only mutated by `swap()`.
    active: AtomicUsize,
    /// Registered views per slot
    readers: [AtomicUsize; 2],
    /// Serializes `swap()` against view registration
    control: Mutex<()>,
    writer: Mutex<WriterState>,
    capacity: usize,
}

/// Bounded double-buffered sample store for one channel.
///
/// Cloning is cheap and yields another handle to the same buffer.
#[derive(Clone)]
pub struct SampleBuffer {
    inner: Arc<SampleBufferInner>,
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("capacity", &self.inner.capacity)
            .field("active", &self.inner.active.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SampleBuffer {
    /// Create a buffer holding at most `capacity` samples per side.
    ///
    /// Both slots are allocated up front; appends never reallocate. Fails with
    /// [`DaqError::InvalidConfig`] for a zero capacity, one above [`MAX_CAPACITY`],
    /// or an allocation the system refuses.
    pub fn new(capacity: usize) -> AppResult<Self> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(DaqError::InvalidConfig(format!(
                "sample buffer capacity must be in 1..={MAX_CAPACITY}, got {capacity}"
            )));
        }

        Ok(Self {
            inner: Arc::new(SampleBufferInner {
                slots: [
                    RwLock::new(allocate_slot(capacity)?),
                    RwLock::new(allocate_slot(capacity)?),
                ],
                active: AtomicUsize::new(0),
                readers: [AtomicUsize::new(0), AtomicUsize::new(0)],
                control: Mutex::new(()),
                writer: Mutex::new(WriterState::default()),
                capacity,
            }),
        })
    }

    /// Maximum number of samples retained per side.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Number of samples currently retained (at most `capacity`).
    pub fn len(&self) -> usize {
        self.inner.writer.lock().len
    }

    /// Whether no sample has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Timestamp of the last accepted sample.
    pub fn last_timestamp(&self) -> Option<f64> {
        self.inner.writer.lock().last_timestamp
    }

    /// Append a sample to the active side, evicting the oldest sample once full.
    ///
    /// Fails with [`DaqError::OutOfOrderSample`] if `sample.timestamp` precedes the
    /// last accepted timestamp (or is NaN). A rejected sample leaves the buffer
    /// untouched.
    pub fn append(&self, sample: Sample) -> AppResult<()> {
        let inner = &*self.inner;
        let mut writer = inner.writer.lock();

        let last = writer.last_timestamp.unwrap_or(f64::NEG_INFINITY);
        if sample.timestamp.is_nan() || sample.timestamp < last {
            warn!(
                timestamp = sample.timestamp,
                last, "Rejected out-of-order sample"
            );
            return Err(DaqError::OutOfOrderSample {
                timestamp: sample.timestamp,
                last,
            });
        }

        let active = inner.active.load(Ordering::Acquire);
        let mut slot = inner.slots[active].write();

        if writer.replay > 0 {
            // The standby side cannot become active while we hold `writer`, so a
            // shared lock is enough and never contends with views.
            let standby = inner.slots[1 - active].read();
            let start = standby.len().saturating_sub(writer.replay);
            for replayed in standby.range(start..) {
                push_bounded(&mut slot, inner.capacity, *replayed);
            }
            trace!(replayed = writer.replay, "Replayed samples into active slot");
            writer.replay = 0;
        }

        push_bounded(&mut slot, inner.capacity, sample);
        writer.len = slot.len();
        writer.pending = (writer.pending + 1).min(inner.capacity);
        writer.last_timestamp = Some(sample.timestamp);
        Ok(())
    }

    /// Exchange the active and standby roles.
    ///
    /// This is an O(1) index flip. It is deferred while any [`StandbyView`] is
    /// registered on the standby slot, so a reader never observes a slot that is
    /// receiving writes.
    pub fn swap(&self) -> SwapOutcome {
        let inner = &*self.inner;
        let _control = inner.control.lock();
        let mut writer = inner.writer.lock();

        if writer.pending == 0 && !writer.stale_standby {
            return SwapOutcome::Current;
        }

        let active = inner.active.load(Ordering::Acquire);
        let standby = 1 - active;
        let readers = inner.readers[standby].load(Ordering::Acquire);
        if readers > 0 {
            debug!(readers, pending = writer.pending, "Swap deferred, standby slot in use");
            return SwapOutcome::Deferred;
        }

        inner.active.store(standby, Ordering::Release);
        if writer.stale_standby {
            // No view is registered on the new active slot, and view() needs `control`
            inner.slots[standby].write().clear();
            writer.stale_standby = false;
        }
        writer.replay = writer.pending;
        writer.pending = 0;
        trace!(active = standby, replay = writer.replay, "Swapped sample slots");
        SwapOutcome::Swapped
    }

    /// Forget every buffered sample and the last accepted timestamp.
    ///
    /// The active slot is emptied at once, so appends may restart from any
    /// timestamp. Returns `true` when the readable side was emptied too, `false`
    /// when a registered view still holds it; in that case the old samples stay
    /// readable until the next successful swap.
    pub fn clear(&self) -> bool {
        let inner = &*self.inner;
        let _control = inner.control.lock();
        let mut writer = inner.writer.lock();

        let active = inner.active.load(Ordering::Acquire);
        let standby = 1 - active;
        inner.slots[active].write().clear();

        let readers = inner.readers[standby].load(Ordering::Acquire);
        let immediate = readers == 0;
        if immediate {
            inner.slots[standby].write().clear();
        } else {
            debug!(readers, "Standby slot in use, clear deferred to next swap");
        }

        *writer = WriterState {
            stale_standby: !immediate,
            ..WriterState::default()
        };
        immediate
    }

    /// Register a read-only view of the current standby slot.
    ///
    /// The view's contents are frozen for its lifetime: the slot it references
    /// cannot become the write target until the view is dropped.
    pub fn view(&self) -> StandbyView {
        let inner = &*self.inner;
        let _control = inner.control.lock();
        let slot = 1 - inner.active.load(Ordering::Acquire);
        inner.readers[slot].fetch_add(1, Ordering::AcqRel);
        StandbyView {
            inner: Arc::clone(&self.inner),
            slot,
        }
    }

    /// Samples on the readable side with `t_start <= timestamp <= t_end`.
    ///
    /// Takes a short-lived view; call [`swap`](Self::swap) first to include the
    /// most recent appends.
    pub fn range_query(&self, t_start: f64, t_end: f64) -> Vec<Sample> {
        self.view().range_query(t_start, t_end)
    }

    /// Linearly interpolated value at `t` on the readable side.
    pub fn interpolate_at(&self, t: f64) -> AppResult<f64> {
        self.view().interpolate_at(t)
    }

    /// Total samples the two slots can hold without reallocating.
    pub fn allocated_samples(&self) -> usize {
        self.inner
            .slots
            .iter()
            .map(|slot| slot.read().capacity())
            .sum()
    }
}

fn allocate_slot(capacity: usize) -> AppResult<VecDeque<Sample>> {
    let mut slot = VecDeque::new();
    slot.try_reserve_exact(capacity).map_err(|err| {
        DaqError::InvalidConfig(format!("cannot allocate {capacity} samples: {err}"))
    })?;
    Ok(slot)
}

fn push_bounded(slot: &mut VecDeque<Sample>, capacity: usize, sample: Sample) {
    if slot.len() == capacity {
        slot.pop_front();
    }
    slot.push_back(sample);
}

/// Registered, read-only view of one buffer's standby slot.
///
/// Dropping the view releases the slot so a pending swap can proceed.
pub struct StandbyView {
    inner: Arc<SampleBufferInner>,
    slot: usize,
}

impl std::fmt::Debug for StandbyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StandbyView")
            .field("slot", &self.slot)
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for StandbyView {
    fn drop(&mut self) {
        self.inner.readers[self.slot].fetch_sub(1, Ordering::AcqRel);
    }
}

impl StandbyView {
    fn with_samples<R>(&self, f: impl FnOnce(&VecDeque<Sample>) -> R) -> R {
        f(&self.inner.slots[self.slot].read())
    }

    /// Number of samples in the view.
    pub fn len(&self) -> usize {
        self.with_samples(VecDeque::len)
    }

    /// Whether the view holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every sample in the view, oldest first.
    pub fn samples(&self) -> Vec<Sample> {
        self.with_samples(|samples| samples.iter().copied().collect())
    }

    /// Oldest sample in the view.
    pub fn first(&self) -> Option<Sample> {
        self.with_samples(|samples| samples.front().copied())
    }

    /// Most recent sample in the view.
    pub fn latest(&self) -> Option<Sample> {
        self.with_samples(|samples| samples.back().copied())
    }

    /// Samples with `t_start <= timestamp <= t_end`, oldest first.
    ///
    /// Binary search over the sorted slot: O(log N + k). An empty or
    /// non-intersecting range yields an empty vector.
    pub fn range_query(&self, t_start: f64, t_end: f64) -> Vec<Sample> {
        self.with_samples(|samples| {
            let lo = samples.partition_point(|s| s.timestamp < t_start);
            let hi = samples.partition_point(|s| s.timestamp <= t_end);
            if lo >= hi {
                return Vec::new();
            }
            samples.range(lo..hi).copied().collect()
        })
    }

    /// Linearly interpolated value at `t`.
    ///
    /// Outside the stored range the nearest boundary value is returned unchanged
    /// (clamped, never extrapolated). Fails with [`DaqError::NoData`] when empty.
    pub fn interpolate_at(&self, t: f64) -> AppResult<f64> {
        self.with_samples(|samples| {
            let (first, last) = match (samples.front(), samples.back()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => return Err(DaqError::NoData),
            };

            if t.is_nan() || t <= first.timestamp {
                return Ok(first.value);
            }
            if t >= last.timestamp {
                return Ok(last.value);
            }

            // first.timestamp < t < last.timestamp, so 1 <= idx < len
            let idx = samples.partition_point(|s| s.timestamp <= t);
            let (a, b) = (samples[idx - 1], samples[idx]);
            let span = b.timestamp - a.timestamp;
            if span <= 0.0 {
                return Ok(a.value);
            }
            Ok(a.value + (b.value - a.value) * (t - a.timestamp) / span)
        })
    }

    /// Mean of the trailing `window` values, or of every value if fewer exist.
    ///
    /// `None` when the view is empty.
    pub fn trailing_mean(&self, window: usize) -> Option<f64> {
        self.with_samples(|samples| {
            if samples.is_empty() || window == 0 {
                return None;
            }
            let take = window.min(samples.len());
            let start = samples.len() - take;
            let sum: f64 = samples.range(start..).map(|s| s.value).sum();
            Some(sum / take as f64)
        })
    }

    /// `(min, max)` over the values in the view.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.with_samples(|samples| {
            samples.iter().fold(None, |acc, s| match acc {
                None => Some((s.value, s.value)),
                Some((lo, hi)) => Some((lo.min(s.value), hi.max(s.value))),
            })
        })
    }
}
