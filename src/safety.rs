//! Guards against the store being written over its own inputs.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that the data file is safe to (over)write.
///
/// Checks:
/// - It must be a `.json` file
/// - It must not be one of the inputs, nor sit inside an input directory
///   (the next replay of that directory would read it as a snapshot)
/// - Its name must not look like a snapshot capture
pub fn validate_data_path(data: &Path, inputs: &[&Path]) -> Result<()> {
    let name = data.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if data.extension().and_then(|e| e.to_str()) != Some("json") {
        bail!(
            "Safety check failed: data file '{}' must have a .json extension",
            data.display()
        );
    }

    for input in inputs {
        if data == *input {
            bail!(
                "Safety check failed: data file '{}' cannot be the same as input '{}'",
                data.display(),
                input.display()
            );
        }
        if input.is_dir() && data.starts_with(input) {
            bail!(
                "Safety check failed: data file '{}' is inside snapshot directory '{}'",
                data.display(),
                input.display()
            );
        }
    }

    if name.to_lowercase().contains("snapshot") {
        bail!(
            "Safety check failed: data file '{}' is named like a snapshot",
            data.display()
        );
    }

    Ok(())
}
