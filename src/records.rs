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
//! Module defining record data types to (de-)serialize out-of-order events to CSV.
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::arrivals::OutOfOrderEvent;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
/// A reordered frame, together with the log it was found in.
pub struct EventRecord {
    /// Arrival log the frame was read from
    pub source: String,
    pub frame: String,
    pub timestamp: f64,
    /// Timestamp the frame was compared against
    pub reference: f64,
    /// `reference - timestamp`, in seconds
    pub lag: f64,
}

impl EventRecord {
    pub fn new(source: impl Into<String>, event: &OutOfOrderEvent) -> Self {
        Self {
            source: source.into(),
            frame: event.frame.clone(),
            timestamp: event.timestamp.into_inner(),
            reference: event.reference.into_inner(),
            lag: event.lag(),
        }
    }
}

/// Writes out-of-order events as CSV rows (with a header) as they are found.
pub struct EventWriter<W: Write> {
    csv: csv::Writer<W>,
}

impl EventWriter<File> {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, csv::Error> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> EventWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            csv: csv::WriterBuilder::new()
                .has_headers(true)
                .from_writer(writer),
        }
    }

    pub fn write(&mut self, record: &EventRecord) -> Result<(), csv::Error> {
        self.csv.serialize(record)
    }

    /// Write the row for `event`, found in the log `source`.
    pub fn write_event(&mut self, source: &str, event: &OutOfOrderEvent) -> Result<(), csv::Error> {
        self.write(&EventRecord::new(source, event))
    }

    pub fn flush(&mut self) -> Result<(), csv::Error> {
        self.csv.flush()?;
        Ok(())
    }
}
