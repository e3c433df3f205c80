// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The time-interval configuration store.
//!
//! A [Timeline] is a sequence of time-stamped records, each valid from its
//! start instant (an MJD) until the next record's start, or forever for the
//! last one. Timelines from several sources (the designed oscillator's setup
//! table, one table per comb, the Circular T epochs) are merged with
//! forward-fill semantics so that every merged record reflects the last known
//! value of every field at its start instant. A merged timeline can then be
//! "reduced" to only the change points of a chosen subset of fields, which is
//! how output segments are partitioned.

pub(crate) mod cirt;
mod error;
pub(crate) mod load;

pub use error::{SetupError, TimelineError};

use std::collections::BTreeMap;

/// One record of a [Timeline]: a value valid over `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Span<T> {
    /// Start instant (inclusive), MJD.
    pub start: f64,

    /// End instant (exclusive), MJD. Always the start of the next span in the
    /// timeline, or `f64::INFINITY` for the last span.
    pub end: f64,

    pub value: T,
}

/// A sequence of time-stamped records with derived ends.
///
/// Invariant: span starts are finite and strictly increasing, and the spans
/// partition `[first.start, +inf)` with no gaps or overlaps.
#[derive(Debug, Clone, Default)]
pub struct Timeline<T> {
    spans: Vec<Span<T>>,
}

impl<T> Timeline<T> {
    /// Build a timeline from `(start, value)` points. The points are sorted;
    /// duplicate or non-finite starts are rejected.
    pub fn from_points(points: Vec<(f64, T)>) -> Result<Timeline<T>, TimelineError> {
        if points.iter().any(|(t, _)| !t.is_finite()) {
            return Err(TimelineError::NonFiniteStart);
        }
        let mut points = points;
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        for pair in points.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(TimelineError::DuplicateStart { mjd: pair[0].0 });
            }
        }

        let mut timeline = Timeline {
            spans: points
                .into_iter()
                .map(|(start, value)| Span {
                    start,
                    end: f64::INFINITY,
                    value,
                })
                .collect(),
        };
        timeline.fix_ends();
        Ok(timeline)
    }

    pub fn spans(&self) -> &[Span<T>] {
        &self.spans
    }

    pub(crate) fn spans_mut(&mut self) -> &mut [Span<T>] {
        &mut self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span<T>> {
        self.spans.iter()
    }

    /// Re-derive every span's end from its successor's start.
    fn fix_ends(&mut self) {
        let starts: Vec<f64> = self.spans.iter().skip(1).map(|s| s.start).collect();
        for (span, next_start) in self
            .spans
            .iter_mut()
            .zip(starts.into_iter().chain(std::iter::once(f64::INFINITY)))
        {
            span.end = next_start;
        }
    }

    pub fn map<V>(&self, f: impl Fn(&T) -> V) -> Timeline<V> {
        Timeline {
            spans: self
                .spans
                .iter()
                .map(|s| Span {
                    start: s.start,
                    end: s.end,
                    value: f(&s.value),
                })
                .collect(),
        }
    }
}

impl<T: Clone> Timeline<T> {
    /// The spans whose interval intersects `[start, stop)`; that is, spans
    /// with `end >= start && start < stop`. Ends are left as derived over the
    /// whole timeline, so the first and last kept spans may extend beyond the
    /// requested window.
    pub fn limit(&self, start: f64, stop: f64) -> Timeline<T> {
        Timeline {
            spans: self
                .spans
                .iter()
                .filter(|s| s.end >= start && s.start < stop)
                .cloned()
                .collect(),
        }
    }

    /// Outer join with forward fill: the result has a span at every start
    /// instant present in either input, and `f` is called with the last known
    /// value of each source at that instant (`None` before a source's first
    /// span).
    pub fn merge_with<U: Clone, V>(
        &self,
        other: &Timeline<U>,
        f: impl Fn(Option<&T>, Option<&U>) -> V,
    ) -> Timeline<V> {
        let mut spans = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        let mut last_a: Option<&T> = None;
        let mut last_b: Option<&U> = None;

        while i < self.spans.len() || j < other.spans.len() {
            let ta = self.spans.get(i).map(|s| s.start);
            let tb = other.spans.get(j).map(|s| s.start);
            let t = match (ta, tb) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) => a,
                (None, Some(b)) => b,
                (None, None) => unreachable!("loop condition"),
            };
            if ta == Some(t) {
                last_a = Some(&self.spans[i].value);
                i += 1;
            }
            if tb == Some(t) {
                last_b = Some(&other.spans[j].value);
                j += 1;
            }
            spans.push(Span {
                start: t,
                end: f64::INFINITY,
                value: f(last_a, last_b),
            });
        }

        let mut timeline = Timeline { spans };
        timeline.fix_ends();
        timeline
    }

    /// Keep only the first span of each maximal run of spans whose `key` is
    /// equal, and re-derive ends over the kept spans (so a reduced span may
    /// cover several original change points). Idempotent.
    pub fn reduce_by_key<K: PartialEq>(&self, key: impl Fn(&T) -> K) -> Timeline<T> {
        let mut spans: Vec<Span<T>> = Vec::new();
        let mut last_key: Option<K> = None;
        for span in &self.spans {
            let k = key(&span.value);
            if last_key.as_ref() != Some(&k) {
                spans.push(span.clone());
                last_key = Some(k);
            }
        }
        let mut timeline = Timeline { spans };
        timeline.fix_ends();
        timeline
    }
}

/// The setup of a designed oscillator, one row of its setup table.
#[derive(Debug, Clone, PartialEq)]
pub struct DoConfig {
    /// The nominal absolute optical frequency \[Hz\] as a decimal string;
    /// kept exact until the frequency translation.
    pub nominal: String,

    /// The comb tooth number N.
    pub tooth_n: i64,

    /// Which comb this oscillator is measured on.
    pub comb: String,

    /// The name of the physical oscillator (e.g. which clock laser).
    pub physical: String,

    /// Counter channels carrying the beat note, as column indices into the
    /// raw data array (column 0 is the timestamp). One to three channels.
    pub counters: Vec<usize>,

    /// Lower bounds on the raw channel readings \[Hz\]; length 1 broadcasts
    /// to every channel.
    pub lower: Vec<f64>,

    /// Upper bounds on the raw channel readings \[Hz\].
    pub upper: Vec<f64>,

    /// Local-oscillator offsets added to each channel before taking the beat
    /// magnitude \[Hz\]; length 1 broadcasts.
    pub lo_freqs: Vec<f64>,

    /// Double-counting threshold \[Hz\]. Required when more than one counter
    /// channel is configured.
    pub threshold: Option<f64>,

    /// Sign convention of the counted beat relative to the comb tooth; +1 or
    /// -1.
    pub f_beat_sign: i32,

    /// Harmonic multiplier applied to both the beat and the tooth frequency
    /// (e.g. 2 for second-harmonic generation).
    pub k_scale: i64,

    /// Multiplier applied to f0 only, for setups where the offset beat is
    /// measured on a frequency-doubled branch.
    pub f0_scale: i64,

    /// A fixed frequency correction applied once, unscaled \[Hz\].
    pub f_offset: f64,
}

/// The setup of one comb, one row of its setup table.
#[derive(Debug, Clone, PartialEq)]
pub struct CombConfig {
    /// Repetition rate \[Hz\].
    pub f_rep: f64,

    /// Carrier-envelope offset frequency \[Hz\].
    pub f0: f64,

    /// The data column carrying the counted f0 (column 0 is the timestamp).
    pub counter_f0: usize,

    /// The maser this comb is referenced to.
    pub maser: String,
}

/// A fully merged setup record: the last known state of every source at some
/// instant.
#[derive(Debug, Clone, Default)]
pub struct Setup {
    /// The designed oscillator's setup; `None` before its first record.
    pub do_cfg: Option<DoConfig>,

    /// Last known setup of every comb seen so far, keyed by comb name.
    pub combs: BTreeMap<String, CombConfig>,

    /// The Circular T epoch label (e.g. "2022-03").
    pub cirt: Option<String>,

    /// Human-readable name for output partitioning; see [attach_names].
    pub name: String,
}

impl Setup {
    /// The active DO and comb configurations, if both are known. A setup
    /// without them is invalid and produces no output.
    pub fn active(&self) -> Option<(&DoConfig, &CombConfig)> {
        let do_cfg = self.do_cfg.as_ref()?;
        let comb = self.combs.get(&do_cfg.comb)?;
        Some((do_cfg, comb))
    }

    pub fn is_valid(&self) -> bool {
        self.active().is_some()
    }

    /// The comb-agnostic maser name: whatever maser the active comb is
    /// referenced to.
    pub fn maser(&self) -> Option<&str> {
        self.active().map(|(_, comb)| comb.maser.as_str())
    }

    /// The string value of a tracked field, empty when unknown.
    pub fn tracked_value(&self, field: TrackedField) -> String {
        match field {
            TrackedField::Nominal => self
                .do_cfg
                .as_ref()
                .map(|d| d.nominal.clone())
                .unwrap_or_default(),
            TrackedField::Physical => self
                .do_cfg
                .as_ref()
                .map(|d| d.physical.clone())
                .unwrap_or_default(),
            TrackedField::Comb => self
                .do_cfg
                .as_ref()
                .map(|d| d.comb.clone())
                .unwrap_or_default(),
            TrackedField::Maser => self.maser().unwrap_or_default().to_string(),
            TrackedField::Cirt => self.cirt.clone().unwrap_or_default(),
        }
    }
}

/// A setup field whose changes can partition the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Nominal,
    Physical,
    Comb,
    Maser,
    Cirt,
}

/// Set every span's `name` from the tracked fields, joined with `-`.
///
/// `fix` fields always appear; `var` fields only if their value actually
/// changes somewhere in the timeline, so the name reflects only dimensions
/// that vary. Both lists are reversed before joining, which puts the Circular
/// T label first; the published output paths rely on that order.
pub fn attach_names(timeline: &mut Timeline<Setup>, fix: &[TrackedField], var: &[TrackedField]) {
    let varying: Vec<TrackedField> = var
        .iter()
        .filter(|&&field| {
            let mut values = timeline.iter().map(|s| s.value.tracked_value(field));
            match values.next() {
                Some(first) => values.any(|v| v != first),
                None => false,
            }
        })
        .copied()
        .collect();

    let track: Vec<TrackedField> = fix
        .iter()
        .rev()
        .chain(varying.iter().rev())
        .copied()
        .collect();

    for span in timeline.spans_mut() {
        span.value.name = track
            .iter()
            .map(|&field| span.value.tracked_value(field))
            .collect::<Vec<_>>()
            .join("-");
    }
}
