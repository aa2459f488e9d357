use std::fs;
use std::path::Path;

use crate::common::error::ConfigError;

/// Trims each number and drops the blank ones, keeping order.
pub fn normalize_recipients<I, S>(numbers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    numbers
        .into_iter()
        .map(|number| number.as_ref().trim().to_string())
        .filter(|number| !number.is_empty())
        .collect()
}

/// One phone number per line; surrounding whitespace and blank lines are
/// ignored.
pub fn parse_recipients(contents: &str) -> Vec<String> {
    normalize_recipients(contents.lines())
}

pub fn load_recipients(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_recipients(&contents))
}
