//! Parser for the `/proc/mdstat` software-RAID status report.
//!
//! The report is loosely structured. Each md device occupies a section of
//! consecutive lines:
//!
//! ```text
//! md0 : active raid1 sdb1[2] sda1[0]                  <- header
//!       1953511936 blocks [2/1] [U_]                  <- status line (mandatory)
//!       bitmap: 0/15 pages [0KB], 65536KB chunk       <- optional
//!       [==>...]  recovery = 45.0% (878780416/1953511936) finish=92.3min
//!                                                     <- build line (optional)
//! ```
//!
//! Preamble lines (`Personalities ...`, `unused devices ...`), blank lines and
//! indented detail lines are skipped while scanning for headers.
//!
//! Numeric fields are pulled out with two small pattern contracts:
//!
//! - status line: a `<digits> blocks ` prefix followed by exactly one
//!   `[<digits>/<digits>] [U_...]` disk group, three captures in total
//!   (blocks, total disks, active disks);
//! - build line: exactly one `(<digits>/<digits>)` ratio, one capture
//!   (synced blocks).
//!
//! Any other number of captures is an error; the parser never guesses.

use regex::Regex;
use std::fmt;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// `<blocks> blocks ` prefix of a status line.
static BLOCKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) blocks ").expect("blocks pattern is valid"));

/// `[<total>/<active>] [UU_]` disk group of a status line.
static DISKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)/(\d+)\] \[[U_]+\]").expect("disks pattern is valid"));

/// `(<synced>/<total>)` ratio of a build line.
static BUILD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)/\d+\)").expect("build pattern is valid"));

/// Header lines starting with these carry no device data.
const PREAMBLE_PREFIXES: [&str; 2] = ["Personalities", "unused"];

/// Array state word marking a running array.
const ACTIVE_STATE: &str = "active";

const STATUS_CAPTURES: usize = 3;
const BUILD_CAPTURES: usize = 1;

/// Status of one md device as reported by `/proc/mdstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatus {
    /// Device name, e.g. `md0`.
    pub name: String,
    /// Whether the array state is `active`.
    pub active: bool,
    /// Number of currently active member disks.
    pub disks_active: u64,
    /// Number of configured member disks.
    pub disks_total: u64,
    /// Total size of the array in blocks.
    pub blocks_total: u64,
    /// Blocks in sync. Equal to `blocks_total` unless a resync or recovery runs.
    pub blocks_synced: u64,
}

/// Which pattern-matched line an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Status,
    Build,
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKind::Status => write!(f, "statusline"),
            LineKind::Build => write!(f, "buildline"),
        }
    }
}

/// Error type for mdstat parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Device header with fewer than three tokens.
    MalformedHeader { line: String },
    /// Not enough lines after a device header for its status section.
    TruncatedSection { device: String, path: PathBuf },
    /// The line pattern produced fewer captures than required.
    TooFewMatches { kind: LineKind, line: String },
    /// The line pattern produced more captures than required.
    TooManyMatches { kind: LineKind, line: String },
    /// A captured number could not be converted.
    InvalidNumber {
        kind: LineKind,
        line: String,
        source: ParseIntError,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedHeader { line } => write!(f, "error parsing mdline: {}", line),
            ParseError::TruncatedSection { device, path } => write!(
                f,
                "entry for {} in {} has fewer lines than expected",
                device,
                path.display()
            ),
            ParseError::TooFewMatches { kind, line } => {
                write!(f, "too few matches found in {}: {}", kind, line)
            }
            ParseError::TooManyMatches { kind, line } => {
                write!(f, "too many matches found in {}: {}", kind, line)
            }
            ParseError::InvalidNumber { kind, line, source } => {
                write!(f, "{} in {}: {}", source, kind, line)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::InvalidNumber { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Parses `/proc/mdstat` content into one [`DeviceStatus`] per device, in the
/// order the device headers appear.
///
/// `source` only names the report in error messages.
pub fn parse_mdstat(content: &str, source: &Path) -> Result<Vec<DeviceStatus>, ParseError> {
    // Split on '\n' rather than lines(): the trailing empty line of a report
    // counts towards the lines a section needs.
    let lines: Vec<&str> = content.split('\n').collect();

    // Header, status line and a separating blank line per device.
    let mut devices = Vec::with_capacity(lines.len() / 3);

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.is_empty() || line.starts_with(char::is_whitespace) || is_preamble(line) {
            i += 1;
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(ParseError::MalformedHeader {
                line: line.to_string(),
            });
        }
        let name = tokens[0];
        let active = tokens[2] == ACTIVE_STATE;

        if lines.len() <= i + 3 {
            return Err(ParseError::TruncatedSection {
                device: name.to_string(),
                path: source.to_path_buf(),
            });
        }

        let (blocks_total, disks_total, disks_active) = eval_status_line(lines[i + 1])?;

        let mut j = i + 2;
        if lines[j].contains("bitmap") {
            j += 1;
        }

        let blocks_synced = if is_build_line(lines[j]) {
            let synced = eval_build_line(lines[j])?;
            j += 1;
            synced
        } else {
            blocks_total
        };

        devices.push(DeviceStatus {
            name: name.to_string(),
            active,
            disks_active,
            disks_total,
            blocks_total,
            blocks_synced,
        });

        i = j;
    }

    Ok(devices)
}

fn is_preamble(line: &str) -> bool {
    PREAMBLE_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

fn is_build_line(line: &str) -> bool {
    line.contains("recovery") || line.contains("resync")
}

/// Returns `(blocks_total, disks_total, disks_active)` of a status line.
fn eval_status_line(line: &str) -> Result<(u64, u64, u64), ParseError> {
    let mut captures = Vec::with_capacity(STATUS_CAPTURES);

    // Disk groups are only searched after the block prefix, as in
    // `(\d+) blocks .*\[(\d+)/(\d+)\] \[[U_]+\]`.
    let rest = match BLOCKS_RE.captures(line) {
        Some(caps) => {
            captures.extend(caps.get(1).map(|m| m.as_str()));
            caps.get(0).map_or(line, |m| &line[m.end()..])
        }
        None => line,
    };
    for caps in DISKS_RE.captures_iter(rest) {
        captures.extend(caps.iter().skip(1).flatten().map(|m| m.as_str()));
    }

    check_capture_count(LineKind::Status, line, captures.len(), STATUS_CAPTURES)?;

    let blocks = parse_number(LineKind::Status, line, captures[0])?;
    let total = parse_number(LineKind::Status, line, captures[1])?;
    let active = parse_number(LineKind::Status, line, captures[2])?;

    Ok((blocks, total, active))
}

/// Returns the number of already synced blocks of a resync/recovery line.
fn eval_build_line(line: &str) -> Result<u64, ParseError> {
    let captures: Vec<&str> = BUILD_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect();

    check_capture_count(LineKind::Build, line, captures.len(), BUILD_CAPTURES)?;

    parse_number(LineKind::Build, line, captures[0])
}

fn check_capture_count(
    kind: LineKind,
    line: &str,
    found: usize,
    expected: usize,
) -> Result<(), ParseError> {
    if found < expected {
        return Err(ParseError::TooFewMatches {
            kind,
            line: line.to_string(),
        });
    }
    if found > expected {
        return Err(ParseError::TooManyMatches {
            kind,
            line: line.to_string(),
        });
    }
    Ok(())
}

fn parse_number(kind: LineKind, line: &str, digits: &str) -> Result<u64, ParseError> {
    digits
        .parse()
        .map_err(|source| ParseError::InvalidNumber {
            kind,
            line: line.to_string(),
            source,
        })
}
