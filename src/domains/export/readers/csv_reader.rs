use crate::domains::export::types::CsvConfig;
use crate::errors::DomainResult;
use csv::StringRecord;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Pulls CSV records from an async reader one at a time.
///
/// Input is read line by line. A record whose quoted field spans several
/// lines is complete once its quote characters balance.
pub struct CsvRecordReader<R: AsyncRead + Unpin + Send> {
    inner: BufReader<R>,
    config: CsvConfig,
}

impl<R: AsyncRead + Unpin + Send> CsvRecordReader<R> {
    pub fn new(reader: R, config: CsvConfig) -> Self {
        Self {
            inner: BufReader::new(reader),
            config,
        }
    }

    /// Raw bytes of the next record, or `None` at end of input
    async fn next_raw(&mut self) -> DomainResult<Option<Vec<u8>>> {
        let quote = self.config.quote_char;
        let mut raw = Vec::new();
        let mut quotes = 0;
        loop {
            let start = raw.len();
            if self.inner.read_until(b'\n', &mut raw).await? == 0 {
                return Ok(if raw.is_empty() { None } else { Some(raw) });
            }
            quotes += raw[start..].iter().filter(|&&b| b == quote).count();
            if quotes % 2 == 0 {
                return Ok(Some(raw));
            }
        }
    }

    /// Next record, skipping blank lines. `None` at end of input.
    ///
    /// The outer error is a failed read; the inner one a record that does
    /// not parse, which leaves the reader usable.
    pub async fn next_record(&mut self) -> DomainResult<Option<csv::Result<StringRecord>>> {
        while let Some(raw) = self.next_raw().await? {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(self.config.delimiter)
                .quote(self.config.quote_char)
                .has_headers(false)
                .flexible(true)
                .from_reader(raw.as_slice());
            if let Some(record) = reader.records().next() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
