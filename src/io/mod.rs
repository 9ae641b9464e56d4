mod geometry;
pub use geometry::Geometry;

mod ply;
pub use ply::{read_ply, write_ply};

pub mod hand_eye;
pub mod pose_stream;
pub mod pv;
pub mod trajectory_log;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Parses a list of floats separated by commas and/or whitespace.
pub fn read_float_list(content: &str) -> Result<Vec<f64>> {
    content
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|err| Error::parser(format!("Invalid number '{token}': {err}")))
        })
        .collect()
}

/// Reads the non-empty lines of a text file, trimmed.
pub(crate) fn read_lines<P: AsRef<Path>>(filepath: P) -> Result<Vec<String>> {
    let file = std::fs::File::open(filepath)?;
    let reader = std::io::BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Lists the files in `folder` matching `pattern` (e.g., `"*.pgm"`), sorted by path.
pub fn glob_sorted<P: AsRef<Path>>(folder: P, pattern: &str) -> Result<Vec<PathBuf>> {
    let folder = glob::Pattern::escape(&folder.as_ref().to_string_lossy());
    let mut paths = glob::glob(&format!("{folder}/{pattern}"))?
        .collect::<std::result::Result<Vec<PathBuf>, glob::GlobError>>()?;
    paths.sort();
    Ok(paths)
}

/// Parses a sensor timestamp, which may be written as an integer or a float (`"123.0"`).
pub fn parse_timestamp(token: &str) -> Result<u64> {
    let token = token.trim();
    token.parse::<u64>().or_else(|_| {
        token
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .map(|value| value as u64)
            .ok_or_else(|| Error::parser(format!("Invalid timestamp '{token}'")))
    })
}
