use crate::domains::export::codec::render_row;
use crate::domains::export::schema::Header;
use crate::domains::export::types::{CsvConfig, ExportStats};
use crate::errors::DomainResult;
use crate::types::Entity;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use std::time::Instant;

/// Streams a typed CSV document to an async writer, one record at a time
pub struct TypedCsvWriter<W: AsyncWrite + Unpin + Send> {
    inner: W,
    config: CsvConfig,
    header_written: bool,
    stats: ExportStats,
    start_time: Instant,
}

impl<W: AsyncWrite + Unpin + Send> TypedCsvWriter<W> {
    pub fn new(writer: W, config: CsvConfig) -> Self {
        Self {
            inner: writer,
            config,
            header_written: false,
            stats: ExportStats::default(),
            start_time: Instant::now(),
        }
    }

    /// Write the header row. Only the first call writes anything.
    pub async fn write_header(&mut self, header: &Header) -> DomainResult<()> {
        if self.header_written {
            return Ok(());
        }
        self.write_record(header.columns()).await?;
        self.header_written = true;
        self.stats.columns = header.len();
        Ok(())
    }

    /// Write one entity rendered against `header`
    pub async fn write_entity(&mut self, header: &Header, entity: &Entity) -> DomainResult<()> {
        self.write_header(header).await?;
        self.write_record(render_row(header, entity)).await?;
        self.stats.rows_written += 1;
        Ok(())
    }

    async fn write_record<I, S>(&mut self, fields: I) -> DomainResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut buffer = Vec::new();
        {
            let mut wtr = csv::WriterBuilder::new()
                .delimiter(self.config.delimiter)
                .quote(self.config.quote_char)
                .quote_style(csv::QuoteStyle::Necessary)
                .terminator(self.config.terminator.to_csv())
                .from_writer(&mut buffer);
            wtr.write_record(fields)?;
            wtr.flush()?;
        }

        self.inner.write_all(&buffer).await?;
        self.stats.bytes_written += buffer.len();
        Ok(())
    }

    pub async fn flush(&mut self) -> DomainResult<()> {
        self.inner.flush().await?;
        Ok(())
    }

    /// Flush and return the statistics of everything written
    pub async fn finish(mut self) -> DomainResult<ExportStats> {
        self.flush().await?;
        self.stats.duration_ms = self.start_time.elapsed().as_millis() as u64;
        Ok(self.stats)
    }
}
