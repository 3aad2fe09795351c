//! Line-delimited JSON stores for documents and chunks.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Buffered writer producing one JSON record per line.
pub struct JsonlWriter {
    out: BufWriter<File>,
}

impl JsonlWriter {
    /// Create (or truncate) the file, creating parent directories as needed.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(Self {
            out: BufWriter::new(file),
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Read every record of a JSONL file. Blank lines are ignored.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut records = Vec::new();
    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).with_context(|| {
            format!("Invalid record at {}:{}", path.display(), lineno + 1)
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: u32,
        text: String,
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("deep/rows.jsonl");
        let mut w = JsonlWriter::create(&path).unwrap();
        w.write(&Row { id: 1, text: "line\nbreak".into() }).unwrap();
        w.write(&Row { id: 2, text: "ünïcode".into() }).unwrap();
        w.finish().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let rows: Vec<Row> = read_jsonl(&path).unwrap();
        assert_eq!(rows[0].text, "line\nbreak");
        assert_eq!(rows[1].id, 2);
    }

    #[test]
    fn test_bad_line_reports_location() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.jsonl");
        std::fs::write(&path, "{\"id\":1,\"text\":\"a\"}\n\nnot json\n").unwrap();
        let err = read_jsonl::<Row>(&path).unwrap_err().to_string();
        assert!(err.contains(":3"), "{}", err);
    }

    #[test]
    fn test_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        assert!(read_jsonl::<Row>(&tmp.path().join("none.jsonl")).is_err());
    }
}
