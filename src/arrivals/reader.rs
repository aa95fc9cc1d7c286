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
//! Lazy reader for arrival logs.
//!
//! Each line holds a frame identifier and a timestamp in seconds, separated by whitespace. Any
//! further fields are ignored:
//!
//! ```text
//! 1 1718000000.000125
//! 2 1718000000.000250 udp 1400
//! ```

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use flate2::bufread::GzDecoder;
use ordered_float::NotNan;

use super::{ArrivalError, ArrivalRecord};

/// How to treat a line whose timestamp cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Malformed {
    /// Log a warning and continue with the next line.
    #[default]
    Skip,
    /// Yield an [`ArrivalError::MalformedTimestamp`].
    Fail,
}

/// Iterator over the records of an arrival log, in file order.
///
/// Lines with fewer than two fields are skipped silently.
pub struct ArrivalReader<R> {
    input: R,
    on_malformed: Malformed,
    buf: Vec<u8>,
    lines: usize,
    skipped: usize,
    malformed: usize,
    done: bool,
}

impl ArrivalReader<Box<dyn BufRead + Send>> {
    /// Open an arrival log. Files ending in `.gz` are decompressed on the fly.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ArrivalError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ArrivalError::InputUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let input: Box<dyn BufRead + Send> = if path.extension().is_some_and(|e| e == "gz") {
            log::trace!("reading gz-compressed log {path:?}");
            Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(input))
    }
}

impl<R: BufRead> ArrivalReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            on_malformed: Malformed::default(),
            buf: Vec::new(),
            lines: 0,
            skipped: 0,
            malformed: 0,
            done: false,
        }
    }

    /// Builder API: select how malformed timestamps are treated.
    pub fn on_malformed(mut self, policy: Malformed) -> Self {
        self.on_malformed = policy;
        self
    }

    /// Number of lines read so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Number of lines skipped because they have fewer than two fields.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of lines with a timestamp that could not be parsed.
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}

impl<R: BufRead> Iterator for ArrivalReader<R> {
    type Item = Result<ArrivalRecord, ArrivalError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.input.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => self.lines += 1,
                Err(source) => {
                    self.done = true;
                    return Some(Err(ArrivalError::Io {
                        line: self.lines + 1,
                        source,
                    }));
                }
            }

            let line = String::from_utf8_lossy(&self.buf);
            let mut fields = line.split_whitespace();
            let (Some(frame), Some(token)) = (fields.next(), fields.next()) else {
                log::trace!("skipping line {}: {:?}", self.lines, line.trim_end());
                self.skipped += 1;
                continue;
            };

            match token.parse::<f64>().ok().and_then(|t| NotNan::new(t).ok()) {
                Some(timestamp) => {
                    return Some(Ok(ArrivalRecord {
                        frame: frame.to_string(),
                        timestamp,
                    }))
                }
                None => {
                    self.malformed += 1;
                    match self.on_malformed {
                        Malformed::Skip => {
                            log::warn!(
                                "skipping line {}: invalid timestamp {token:?} of frame {frame}",
                                self.lines
                            );
                        }
                        Malformed::Fail => {
                            return Some(Err(ArrivalError::MalformedTimestamp {
                                line: self.lines,
                                frame: frame.to_string(),
                                token: token.to_string(),
                            }))
                        }
                    }
                }
            }
        }
        None
    }
}
