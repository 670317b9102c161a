//! Error collection shared by the section validators.

use callwire_common::ConfigError;
use std::ops::RangeInclusive;

/// Collects every problem in a config before reporting, so one pass shows
/// them all.
#[derive(Debug, Default)]
pub(crate) struct FieldErrors(Vec<String>);

impl FieldErrors {
    pub(crate) fn in_range(&mut self, field: &str, value: u32, range: RangeInclusive<u32>) {
        if !range.contains(&value) {
            self.0.push(format!(
                "{field} = {value} is out of range [{}, {}]",
                range.start(),
                range.end()
            ));
        }
    }

    pub(crate) fn has_prefix(&mut self, field: &str, value: &str, prefixes: &[&str]) {
        if !prefixes.iter().any(|prefix| value.starts_with(prefix)) {
            self.0.push(format!(
                "{field} = {value:?} must start with one of {}",
                prefixes.join(", ")
            ));
        }
    }

    pub(crate) fn into_result(self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(self.0.join("; ")))
        }
    }
}
