// abilene-lab: Backbone Topology Construction and Arrival-Order Analysis for Network Emulation
// Copyright (C) 2024-2025 The abilene-lab authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Detection of reordered frames in a captured arrival log.
//!
//! Records are processed strictly in the order in which they arrive. A record is out of order if
//! its timestamp is smaller than the reference value, which is (by default) the largest timestamp
//! observed so far. A late frame never lowers the reference value, and equal timestamps are never
//! a violation.

use std::{fmt, io::BufRead};

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

mod error;
mod reader;

pub use error::ArrivalError;
pub use reader::{ArrivalReader, Malformed};

/// A single captured frame, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrivalRecord {
    /// Opaque frame identifier
    pub frame: String,
    /// Capture time in seconds
    pub timestamp: NotNan<f64>,
}

impl ArrivalRecord {
    /// Create a new record. Returns `None` if `timestamp` is NaN.
    pub fn new(frame: impl Into<String>, timestamp: f64) -> Option<Self> {
        Some(Self {
            frame: frame.into(),
            timestamp: NotNan::new(timestamp).ok()?,
        })
    }
}

/// A frame that arrived after a frame with a larger timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutOfOrderEvent {
    pub frame: String,
    pub timestamp: NotNan<f64>,
    /// The value the timestamp was compared against.
    pub reference: NotNan<f64>,
}

impl OutOfOrderEvent {
    /// By how much (in seconds) the frame is late.
    pub fn lag(&self) -> f64 {
        self.reference.into_inner() - self.timestamp.into_inner()
    }
}

impl fmt::Display for OutOfOrderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `{:?}` keeps the fractional part of whole numbers (`2.0` instead of `2`)
        write!(
            f,
            "Out-of-order detected at frame {}: {:?} < {:?}",
            self.frame,
            self.timestamp.into_inner(),
            self.reference.into_inner()
        )
    }
}

/// Value a new timestamp is compared against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum, strum::Display,
)]
pub enum Reference {
    /// Largest timestamp observed so far.
    #[default]
    RunningMax,
    /// Timestamp of the immediately preceding record. This misses frames that are older than an
    /// earlier peak but newer than their predecessor.
    Previous,
}

/// Streaming out-of-order detector. Only the reference value is retained between records.
#[derive(Debug, Clone, Default)]
pub struct OrderAnalyzer {
    reference: Reference,
    current: Option<NotNan<f64>>,
    peak: Option<NotNan<f64>>,
}

impl OrderAnalyzer {
    pub fn new(reference: Reference) -> Self {
        Self {
            reference,
            ..Default::default()
        }
    }

    /// Process the next record. Returns the event if the record is out of order.
    pub fn observe(&mut self, record: &ArrivalRecord) -> Option<OutOfOrderEvent> {
        let ts = record.timestamp;
        self.peak = Some(self.peak.map_or(ts, |p| p.max(ts)));

        let Some(current) = self.current else {
            // the first record is never out of order
            self.current = Some(ts);
            return None;
        };

        if ts < current {
            log::trace!("frame {} is out of order: {ts} < {current}", record.frame);
            if self.reference == Reference::Previous {
                self.current = Some(ts);
            }
            Some(OutOfOrderEvent {
                frame: record.frame.clone(),
                timestamp: ts,
                reference: current,
            })
        } else {
            self.current = Some(ts);
            None
        }
    }

    /// The current reference value, or `None` if no record was observed yet.
    pub fn reference_value(&self) -> Option<f64> {
        self.current.map(NotNan::into_inner)
    }

    /// Largest timestamp observed so far.
    pub fn peak(&self) -> Option<f64> {
        self.peak.map(NotNan::into_inner)
    }
}

/// Lazily report all out-of-order records, compared against the running maximum.
pub fn analyze<I>(records: I) -> impl Iterator<Item = OutOfOrderEvent>
where
    I: IntoIterator<Item = ArrivalRecord>,
{
    analyze_with(records, Reference::RunningMax)
}

/// Lazily report all out-of-order records, using the given reference.
pub fn analyze_with<I>(records: I, reference: Reference) -> impl Iterator<Item = OutOfOrderEvent>
where
    I: IntoIterator<Item = ArrivalRecord>,
{
    let mut analyzer = OrderAnalyzer::new(reference);
    records.into_iter().filter_map(move |r| analyzer.observe(&r))
}

/// Like [`analyze_with`], but for fallible sources such as an [`ArrivalReader`]. Errors are passed
/// through at the position where they occur.
pub fn try_analyze<I, E>(
    records: I,
    reference: Reference,
) -> impl Iterator<Item = Result<OutOfOrderEvent, E>>
where
    I: IntoIterator<Item = Result<ArrivalRecord, E>>,
{
    let mut analyzer = OrderAnalyzer::new(reference);
    records.into_iter().filter_map(move |r| match r {
        Ok(record) => analyzer.observe(&record).map(Ok),
        Err(e) => Some(Err(e)),
    })
}

/// Counters collected while scanning an arrival log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderSummary {
    /// Number of lines read
    pub lines: usize,
    /// Number of valid records
    pub records: usize,
    /// Lines with fewer than two fields
    pub skipped: usize,
    /// Lines whose timestamp could not be parsed
    pub malformed: usize,
    /// Number of out-of-order records
    pub violations: usize,
    /// Largest timestamp observed
    pub max_seen: Option<f64>,
}

impl fmt::Display for OrderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records out of {} lines ({} skipped, {} malformed), {} out of order",
            self.records, self.lines, self.skipped, self.malformed, self.violations,
        )?;
        if let Some(max) = self.max_seen {
            write!(f, ", latest timestamp {max:?}")?;
        }
        Ok(())
    }
}

/// Read the entire log and call `on_event` for every out-of-order record, in arrival order.
///
/// Stops at the first error returned by the reader (a malformed timestamp is only an error if the
/// reader was configured with [`Malformed::Fail`]).
pub fn scan<R, F>(
    mut reader: ArrivalReader<R>,
    reference: Reference,
    mut on_event: F,
) -> Result<OrderSummary, ArrivalError>
where
    R: BufRead,
    F: FnMut(OutOfOrderEvent),
{
    let mut analyzer = OrderAnalyzer::new(reference);
    let mut summary = OrderSummary::default();

    for record in reader.by_ref() {
        let record = record?;
        summary.records += 1;
        if let Some(event) = analyzer.observe(&record) {
            summary.violations += 1;
            on_event(event);
        }
    }

    summary.lines = reader.lines();
    summary.skipped = reader.skipped();
    summary.malformed = reader.malformed();
    summary.max_seen = analyzer.peak();
    Ok(summary)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::*;

    fn records(ts: &[f64]) -> Vec<ArrivalRecord> {
        ts.iter()
            .enumerate()
            .map(|(i, t)| ArrivalRecord::new(format!("f{i}"), *t).unwrap())
            .collect()
    }

    fn triples(events: impl IntoIterator<Item = OutOfOrderEvent>) -> Vec<(String, f64, f64)> {
        events
            .into_iter()
            .map(|e| (e.frame, e.timestamp.into_inner(), e.reference.into_inner()))
            .collect()
    }

    #[test]
    fn running_maximum() {
        let events = triples(analyze(records(&[1.0, 2.0, 1.5, 3.0, 0.5])));
        assert_eq!(
            events,
            vec![("f2".to_string(), 1.5, 2.0), ("f4".to_string(), 0.5, 3.0)]
        );
    }

    #[test]
    fn late_frame_keeps_reference() {
        let mut analyzer = OrderAnalyzer::default();
        let progression = records(&[1.0, 2.0, 1.5, 3.0, 0.5])
            .iter()
            .map(|r| {
                analyzer.observe(r);
                analyzer.reference_value().unwrap()
            })
            .collect::<Vec<_>>();
        assert_eq!(progression, vec![1.0, 2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn equal_timestamps() {
        assert_eq!(analyze(records(&[1.0, 1.0, 1.0])).count(), 0);
        assert_eq!(analyze(records(&[0.0, 2.0, 1.0, 2.0])).count(), 1);
    }

    #[test]
    fn dip_below_earlier_peak() {
        let ts = [5.0, 3.0, 4.0];
        assert_eq!(
            triples(analyze_with(records(&ts), Reference::RunningMax)),
            vec![("f1".to_string(), 3.0, 5.0), ("f2".to_string(), 4.0, 5.0)]
        );
        assert_eq!(
            triples(analyze_with(records(&ts), Reference::Previous)),
            vec![("f1".to_string(), 3.0, 5.0)]
        );
    }

    #[test]
    fn first_record_is_never_flagged() {
        assert_eq!(analyze(records(&[-1.0])).count(), 0);
        assert_eq!(analyze_with(records(&[-1.0]), Reference::Previous).count(), 0);
        assert_eq!(analyze(Vec::new()).count(), 0);
    }

    #[test]
    fn display() {
        let event = analyze(records(&[1.0, 2.0, 1.5])).next().unwrap();
        assert_eq!(
            event.to_string(),
            "Out-of-order detected at frame f2: 1.5 < 2.0"
        );
        assert_eq!(event.lag(), 0.5);
    }

    #[test]
    fn nan_is_not_a_record() {
        assert!(ArrivalRecord::new("f0", f64::NAN).is_none());
    }

    #[test]
    fn errors_pass_through_in_order() {
        let input: Vec<Result<ArrivalRecord, &str>> = vec![
            Ok(ArrivalRecord::new("a", 2.0).unwrap()),
            Err("boom"),
            Ok(ArrivalRecord::new("b", 1.0).unwrap()),
        ];
        let out = try_analyze(input, Reference::RunningMax).collect::<Vec<_>>();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Err("boom"));
        assert_eq!(out[1].as_ref().unwrap().frame, "b");
    }

    #[test]
    fn scan_summary() {
        let log = "f0 1.0\nf1 2.0\ngarbage_no_timestamp\n\nf2 1.5 extra fields\nf3 x\nf4 3.0\n";
        let mut events = Vec::new();
        let summary = scan(
            ArrivalReader::new(Cursor::new(log)),
            Reference::RunningMax,
            |e| events.push(e),
        )
        .unwrap();
        assert_eq!(
            summary,
            OrderSummary {
                lines: 7,
                records: 4,
                skipped: 2,
                malformed: 1,
                violations: 1,
                max_seen: Some(3.0),
            }
        );
        assert_eq!(triples(events), vec![("f2".to_string(), 1.5, 2.0)]);
    }

    #[test]
    fn scan_strict() {
        let log = "f0 1.0\nf1 oops\nf2 0.5\n";
        let reader = ArrivalReader::new(Cursor::new(log)).on_malformed(Malformed::Fail);
        let mut events = 0;
        let err = scan(reader, Reference::RunningMax, |_| events += 1).unwrap_err();
        assert!(matches!(err, ArrivalError::MalformedTimestamp { line: 2, .. }));
        assert_eq!(events, 0);
    }
}
