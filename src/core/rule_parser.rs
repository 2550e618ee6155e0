//! Rule file parsing.
//!
//! One entry per line. `#` comments and blank lines are ignored, lines ending
//! in `.exe` name applications, and everything else is tried as a CIDR block.
//! Lines that are neither are dropped without complaint.

use std::io::BufRead;
use std::path::Path;

use ipnet::IpNet;

use crate::error::AppError;

/// Application patterns and CIDR blocks read from one rule file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRule {
    pub app_patterns: Vec<String>,
    pub cidr_blocks: Vec<String>,
}

/// Parse the rule file at `path`.
pub fn parse_file(path: &Path) -> Result<ParsedRule, AppError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Io(format!("{}: {e}", path.display())))?;
    let rule = parse_reader(std::io::BufReader::new(file))?;
    tracing::debug!(
        "Parsed {}: {} apps, {} cidrs",
        path.display(),
        rule.app_patterns.len(),
        rule.cidr_blocks.len()
    );
    Ok(rule)
}

/// Parse rule lines from any buffered reader.
pub fn parse_reader<R: BufRead>(mut reader: R) -> Result<ParsedRule, AppError> {
    let mut rule = ParsedRule::default();
    let mut dropped = 0usize;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        // Rule files are not guaranteed to be UTF-8 (legacy Windows code pages).
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches('\n').trim_end_matches('\r');

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.ends_with(".exe") {
            rule.app_patterns.push(line.to_string());
            continue;
        }
        if line.parse::<IpNet>().is_ok() {
            rule.cidr_blocks.push(line.to_string());
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        tracing::trace!("Dropped {dropped} unrecognized rule lines");
    }
    Ok(rule)
}
