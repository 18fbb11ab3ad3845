use crate::config::{ExtensionsConfig, ImportErrorPolicy};
use crate::domains::batch::service::submit_batched;
use crate::domains::export::codec::RowDecoder;
use crate::domains::export::readers::CsvRecordReader;
use crate::domains::export::schema::SchemaDiscoverer;
use crate::domains::export::types::{CsvConfig, ExportStats, ImportReport, RowError};
use crate::domains::export::writers::TypedCsvWriter;
use crate::domains::query::paging::PagedQuery;
use crate::domains::table::repository::TableClient;
use crate::domains::table::types::{QueryOptions, TransactionActionType};
use crate::errors::{DomainError, DomainResult};
use crate::types::Entity;
use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

/// Write every entity of the table as typed CSV.
///
/// The header depends on all rows, so the table is read completely before
/// the first row is written.
pub async fn export_csv<C, W>(
    client: &C,
    config: &ExtensionsConfig,
    csv_config: CsvConfig,
    writer: W,
) -> DomainResult<ExportStats>
where
    C: TableClient + ?Sized,
    W: AsyncWrite + Unpin + Send,
{
    let mut discoverer = SchemaDiscoverer::new(config);
    let mut query = PagedQuery::new(client, QueryOptions::new().page_size(config.page_size));
    while let Some(page) = query.next_page().await? {
        discoverer.observe_all(page);
    }
    debug!(
        "Discovered {} columns over {} entities of '{}'",
        discoverer.header().len(),
        discoverer.entity_count(),
        client.table_name()
    );

    let (header, entities) = discoverer.finish();
    let mut out = TypedCsvWriter::new(writer, csv_config);
    out.write_header(&header).await?;
    for entity in &entities {
        out.write_entity(&header, entity).await?;
    }
    let stats = out.finish().await?;

    info!(
        "Exported {} rows ({} columns, {} bytes) from '{}' in {}ms",
        stats.rows_written,
        stats.columns,
        stats.bytes_written,
        client.table_name(),
        stats.duration_ms
    );
    Ok(stats)
}

/// Accumulates decoded entities and submits them every `threshold` rows
struct ImportBuffer<'a, C: TableClient + ?Sized> {
    client: &'a C,
    pending: Vec<Entity>,
    threshold: usize,
    batch_size: usize,
}

impl<'a, C: TableClient + ?Sized> ImportBuffer<'a, C> {
    async fn push(&mut self, entity: Entity, report: &mut ImportReport) -> DomainResult<()> {
        self.pending.push(entity);
        if self.pending.len() >= self.threshold {
            self.flush(report).await?;
        }
        Ok(())
    }

    async fn flush(&mut self, report: &mut ImportReport) -> DomainResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let entities = std::mem::take(&mut self.pending);
        let count = entities.len();
        let chunks = submit_batched(self.client, entities, TransactionActionType::Add, self.batch_size).await?;
        report.chunks_submitted += chunks.len();
        report.entities_imported += count;
        Ok(())
    }
}

/// Read a typed CSV document and add its rows to the table.
///
/// Records are decoded as they arrive; only rows not yet submitted are held
/// in memory. Rows are submitted every `import_flush_threshold` rows and once
/// more at the end. With [`ImportErrorPolicy::FailFast`] the first bad row ends the
/// import with its error; rows flushed before it stay in the table and the
/// rows still pending are dropped. [`ImportErrorPolicy::SkipInvalidRows`]
/// records bad rows in the report instead.
pub async fn import_csv<C, R>(
    client: &C,
    config: &ExtensionsConfig,
    csv_config: CsvConfig,
    reader: R,
) -> DomainResult<ImportReport>
where
    C: TableClient + ?Sized,
    R: AsyncRead + Unpin + Send,
{
    let mut records = CsvRecordReader::new(reader, csv_config);
    let columns: Vec<String> = match records.next_record().await? {
        Some(header) => header?.iter().map(str::to_string).collect(),
        None => Vec::new(),
    };
    let decoder = RowDecoder::new(columns, config.lenient_type_tags);

    let mut report = ImportReport::default();
    let mut buffer = ImportBuffer {
        client,
        pending: Vec::with_capacity(config.import_flush_threshold),
        threshold: config.import_flush_threshold.max(1),
        batch_size: config.batch_size,
    };

    let mut row = 0;
    while let Some(record) = records.next_record().await? {
        row += 1;
        report.rows_read += 1;

        let decoded = record
            .map_err(DomainError::from)
            .and_then(|record| decoder.decode(row, &record));
        match decoded {
            Ok(entity) => buffer.push(entity, &mut report).await?,
            Err(error) => match config.import_error_policy {
                ImportErrorPolicy::FailFast => return Err(error),
                ImportErrorPolicy::SkipInvalidRows => {
                    warn!("Skipping CSV row {} for '{}': {}", row, client.table_name(), error);
                    report.skipped.push(RowError { row, error });
                }
            },
        }
    }
    buffer.flush(&mut report).await?;

    info!(
        "Imported {} of {} rows into '{}' in {} chunk(s), {} skipped",
        report.entities_imported,
        report.rows_read,
        client.table_name(),
        report.chunks_submitted,
        report.skipped.len()
    );
    Ok(report)
}
