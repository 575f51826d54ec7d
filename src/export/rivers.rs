//! River path export as JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::rivers::River;

/// Errors that can occur during river export.
#[derive(Error, Debug)]
pub enum RiverExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct RiverDocument<'a> {
    width: u32,
    height: u32,
    rivers: &'a [River],
}

/// Writes river paths with the grid size they were traced on.
pub fn export_rivers_json(
    rivers: &[River],
    width: u32,
    height: u32,
    path: &Path,
) -> Result<(), RiverExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &RiverDocument { width, height, rivers })?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rivers::{RiverEnd, RiverPoint};
    use glam::UVec2;
    use tempfile::tempdir;

    #[test]
    fn test_rivers_json_reads_back() {
        let rivers = vec![River {
            points: vec![
                RiverPoint {
                    position: UVec2::new(4, 4),
                    flow: 1.0,
                },
                RiverPoint {
                    position: UVec2::new(5, 5),
                    flow: 0.9,
                },
            ],
            end: RiverEnd::LocalMinimum,
        }];
        let dir = tempdir().unwrap();
        let path = dir.path().join("rivers.json");
        export_rivers_json(&rivers, 16, 16, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["width"], 16);
        let back: Vec<River> = serde_json::from_value(value["rivers"].clone()).unwrap();
        assert_eq!(back, rivers);
    }
}
