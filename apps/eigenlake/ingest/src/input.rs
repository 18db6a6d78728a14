//! JSONL record input
//!
//! One JSON object per line: `{"id"?, "properties"?, "vector"}`. Blank lines are skipped.

use eigenlake::{EigenlakeError, EigenlakeResult, Properties};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

#[derive(Debug, Deserialize)]
pub struct InputRecord {
    #[serde(default, alias = "uuid")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Properties,
    pub vector: Vec<f32>,
}

pub struct RecordReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: AsyncBufRead + Unpin> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Next record, `None` at end of input. Parse errors carry the line number.
    pub async fn next_record(&mut self) -> EigenlakeResult<Option<InputRecord>> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .map_err(|e| EigenlakeError::Validation(format!("failed to read input: {}", e)))?
        {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record = serde_json::from_str(line).map_err(|e| {
                EigenlakeError::Validation(format!("line {}: {}", self.line_no, e))
            })?;
            return Ok(Some(record));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eigenlake::ErrorKind;

    #[tokio::test]
    async fn test_reads_records_and_skips_blank_lines() {
        let input: &[u8] = b"{\"id\": \"a\", \"properties\": {\"t\": 1}, \"vector\": [0.5]}\n\n  \n{\"vector\": [1, 2]}\n";
        let mut reader = RecordReader::new(input);

        let first = reader.next_record().await.unwrap().unwrap();
        assert_eq!(first.id.as_deref(), Some("a"));
        assert_eq!(first.properties["t"], 1);
        assert_eq!(first.vector, vec![0.5]);

        let second = reader.next_record().await.unwrap().unwrap();
        assert!(second.id.is_none());
        assert!(second.properties.is_empty());
        assert_eq!(second.vector, vec![1.0, 2.0]);

        assert!(reader.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uuid_alias() {
        let input: &[u8] = b"{\"uuid\": \"u1\", \"vector\": []}";
        let record = RecordReader::new(input).next_record().await.unwrap().unwrap();
        assert_eq!(record.id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_bad_line_reports_line_number() {
        let input: &[u8] = b"{\"vector\": [0.1]}\n\n{\"properties\": {}}\n";
        let mut reader = RecordReader::new(input);
        reader.next_record().await.unwrap();

        let err = reader.next_record().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.detail().starts_with("line 3:"), "{}", err.detail());
    }
}
