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
//! Utility module collection of functions

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

/// Logging configuration used by all binaries, looked up in the working directory.
pub const LOG_CONFIG: &str = "log4rs.yml";

/// Initialize logging from `log4rs.yml`. If the file is missing (or invalid), fall back to
/// `pretty_env_logger`, configured through `RUST_LOG`.
pub fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        match log4rs::init_file(LOG_CONFIG, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Cannot load {LOG_CONFIG}: {e}"),
        }
    }
    let _ = pretty_env_logger::try_init();
}

pub trait PathBufExt: Sized {
    fn then(self, p: impl AsRef<Path>) -> PathBuf;
}

impl PathBufExt for PathBuf {
    fn then(mut self, p: impl AsRef<Path>) -> PathBuf {
        self.push(p);
        self
    }
}

impl PathBufExt for &Path {
    fn then(self, p: impl AsRef<Path>) -> PathBuf {
        let mut path = self.to_path_buf();
        path.push(p);
        path
    }
}

/// Sort paths the way humans expect (`log_2` before `log_10`).
pub fn human_sorted(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| {
        human_sort::compare(
            &a.as_os_str().to_string_lossy(),
            &b.as_os_str().to_string_lossy(),
        )
    });
    paths.dedup();
    paths
}

/// Name of a file (or the full path if it has none), for display purposes.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(OsStr::to_string_lossy)
        .unwrap_or_else(|| path.as_os_str().to_string_lossy())
        .to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn natural_order() {
        let sorted = human_sorted(vec![
            PathBuf::from("logs/udp_times_10.txt"),
            PathBuf::from("logs/udp_times_2.txt"),
            PathBuf::from("logs/udp_times_1.txt"),
            PathBuf::from("logs/udp_times_2.txt"),
        ]);
        assert_eq!(
            sorted,
            vec![
                PathBuf::from("logs/udp_times_1.txt"),
                PathBuf::from("logs/udp_times_2.txt"),
                PathBuf::from("logs/udp_times_10.txt"),
            ]
        );
    }

    #[test]
    fn path_helpers() {
        let p = Path::new("/tmp").then("run").then("udp_times.txt");
        assert_eq!(p, PathBuf::from("/tmp/run/udp_times.txt"));
        assert_eq!(display_name(&p), "udp_times.txt");
    }
}
