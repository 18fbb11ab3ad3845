use chrono::{FixedOffset, TimeZone, Utc};
use std::path::Path;
use table_storage_ext::domains::export::LineTerminator;
use table_storage_ext::{
    CsvConfig, Entity, ExtensionsConfig, InMemoryTable, InMemoryTableStore, PropertyValue, TableExtensions,
    TableServiceExtensions, TransactionActionType,
};
use uuid::Uuid;

const SPECIAL_CHARS: &str = "äöüßÄÖÜ#-.;:_!§$%&/()=?`´*'+~<>|@€{[]}\\^°²³";

fn csv_config() -> CsvConfig {
    CsvConfig {
        terminator: LineTerminator::Lf,
        ..CsvConfig::default()
    }
}

async fn new_table(store: &InMemoryTableStore) -> TableExtensions<InMemoryTable> {
    let service = TableServiceExtensions::with_config(store.clone(), ExtensionsConfig::default());
    let name = format!("t{}", Uuid::new_v4().simple());
    service.create_table_if_not_exists_safe(&name).await.unwrap();
    service.table(&name)
}

/// One entity per supported property kind
fn typed_entities() -> Vec<Entity> {
    let at = Utc.with_ymd_and_hms(2020, 1, 1, 1, 1, 1).unwrap();
    let at_offset = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2020, 1, 1, 1, 1, 1).unwrap();
    vec![
        Entity::new("partition", "01-binary").with("binary", b"binary".to_vec()),
        Entity::new("partition", "02-bool").with("bool", true),
        Entity::new("partition", "03-datetime").with("datetime", at),
        Entity::new("partition", "04-datetimeoffset").with("datetimeoffset", at_offset),
        Entity::new("partition", "05-double").with("double", 1.1),
        Entity::new("partition", "06-guid").with("guid", Uuid::new_v4()),
        Entity::new("partition", "07-int").with("int", 1i32),
        Entity::new("partition", "08-long").with("long", 1i64),
        Entity::new("partition", "09-specialChars").with("specialChars", SPECIAL_CHARS),
        Entity::new("partition", "10-quotes").with("quotes", "string with \"quotes\""),
    ]
}

async fn export_to(table: &TableExtensions<InMemoryTable>, path: &Path) {
    let file = tokio::fs::File::create(path).await.unwrap();
    table.export_csv_with(file, csv_config()).await.unwrap();
}

async fn import_from(table: &TableExtensions<InMemoryTable>, path: &Path) {
    let file = tokio::fs::File::open(path).await.unwrap();
    let report = table.import_csv_with(file, csv_config()).await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
async fn export_file() {
    let store = InMemoryTableStore::new();
    let table = new_table(&store).await;
    table.add_entities(typed_entities(), TransactionActionType::Add).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.csv");
    export_to(&table, &path).await;

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(
        lines[0],
        "PartitionKey,RowKey,Timestamp,binary,binary@type,bool,bool@type,datetime,datetime@type,\
         datetimeoffset,datetimeoffset@type,double,double@type,guid,guid@type,int,int@type,\
         long,long@type,specialChars,specialChars@type,quotes,quotes@type"
    );

    let row = |n: usize| lines[n].split(',').collect::<Vec<&str>>();

    assert_eq!(row(1)[..2], ["partition", "01-binary"]);
    assert_eq!(row(1)[3..5], ["YmluYXJ5", "Binary"]);
    assert_eq!(row(2)[5..7], ["true", "Boolean"]);
    assert_eq!(row(3)[7..9], ["2020-01-01T01:01:01Z", "DateTime"]);
    assert_eq!(row(4)[9..11], ["2020-01-01T01:01:01Z", "DateTime"]);
    assert_eq!(row(5)[11..13], ["1.1", "Double"]);
    assert!(Uuid::parse_str(row(6)[13]).is_ok());
    assert_eq!(row(6)[14], "Guid");
    assert_eq!(row(7)[15..17], ["1", "Int32"]);
    assert_eq!(row(8)[17..19], ["1", "Int64"]);
    assert_eq!(row(9)[19..21], [SPECIAL_CHARS, "String"]);
    assert_eq!(row(10)[21..23], ["\"string with \"\"quotes\"\"\"", "String"]);

    // cells of properties an entity lacks stay empty
    assert_eq!(row(1)[5..7], ["", ""]);
}

#[tokio::test]
async fn import_then_export_reproduces_file() {
    let store = InMemoryTableStore::new();
    let source = new_table(&store).await;
    source.add_entities(typed_entities(), TransactionActionType::Add).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("test.csv");
    let second = dir.path().join("output.csv");
    export_to(&source, &first).await;

    let target = new_table(&store).await;
    import_from(&target, &first).await;
    export_to(&target, &second).await;

    let mut original = csv::Reader::from_path(&first).unwrap();
    let mut copied = csv::Reader::from_path(&second).unwrap();
    let header = original.headers().unwrap().clone();
    assert_eq!(&header, copied.headers().unwrap());

    let left: Vec<csv::StringRecord> = original.records().map(Result::unwrap).collect();
    let right: Vec<csv::StringRecord> = copied.records().map(Result::unwrap).collect();
    assert_eq!(left.len(), right.len());
    for (a, b) in left.iter().zip(&right) {
        for (index, column) in header.iter().enumerate() {
            if column == "Timestamp" {
                continue;
            }
            assert_eq!(a.get(index), b.get(index), "column {}", column);
        }
    }
}

#[tokio::test]
async fn round_trip_preserves_values() {
    let store = InMemoryTableStore::new();
    let source = new_table(&store).await;
    let entities = typed_entities();
    source.add_entities(entities.clone(), TransactionActionType::Add).await.unwrap();

    let mut buffer = Vec::new();
    source.export_csv_with(&mut buffer, csv_config()).await.unwrap();

    let target = new_table(&store).await;
    target.import_csv_with(buffer.as_slice(), csv_config()).await.unwrap();

    let imported = target.get_all_entities().await.unwrap();
    assert_eq!(imported.len(), entities.len());
    for (expected, actual) in entities.iter().zip(&imported) {
        assert!(expected.same_content(actual), "{:?} != {:?}", expected, actual);
    }
    assert_eq!(
        imported[3].get("datetimeoffset"),
        Some(&PropertyValue::DateTime(Utc.with_ymd_and_hms(2020, 1, 1, 1, 1, 1).unwrap()))
    );
}

#[tokio::test]
async fn bool_scenario_survives_reimport() {
    let store = InMemoryTableStore::new();
    let table = new_table(&store).await;
    table
        .add_entities(vec![Entity::new("p", "r1").with("bool", true)], TransactionActionType::Add)
        .await
        .unwrap();

    let mut first = Vec::new();
    table.export_csv_with(&mut first, csv_config()).await.unwrap();

    let copy = new_table(&store).await;
    copy.import_csv_with(first.as_slice(), csv_config()).await.unwrap();
    let mut second = Vec::new();
    copy.export_csv_with(&mut second, csv_config()).await.unwrap();

    let text = String::from_utf8(second).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "PartitionKey,RowKey,Timestamp,bool,bool@type");
    assert!(lines[1].starts_with("p,r1,"));
    assert!(lines[1].ends_with(",true,Boolean"));
}

#[tokio::test]
async fn import_batch() {
    let mut text = String::from("PartitionKey,RowKey,Timestamp,Test,Test@type\n");
    for _ in 0..3000 {
        text.push_str(&format!("123,{},,{},String\n", Uuid::new_v4(), Uuid::new_v4()));
    }
    text.push_str("1,2,,,\n2,2,,,\n3,4,,,\n");

    let store = InMemoryTableStore::new();
    let table = new_table(&store).await;
    let report = table.import_csv_with(text.as_bytes(), csv_config()).await.unwrap();

    assert_eq!(report.rows_read, 3003);
    assert_eq!(report.entities_imported, 3003);
    assert_eq!(table.get_all_entities().await.unwrap().len(), 3003);
    assert!(store.transaction_log().await.iter().all(|t| t.action_count <= 100));
}

#[tokio::test]
async fn ignored_properties_are_not_exported() {
    let store = InMemoryTableStore::new();
    let table = new_table(&store).await;
    table
        .add_entities(
            vec![Entity::new("p", "r").with("odata.etag", "W/\"x\"").with("keep", "yes")],
            TransactionActionType::Add,
        )
        .await
        .unwrap();

    let mut out = Vec::new();
    let stats = table.export_csv_with(&mut out, csv_config()).await.unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().next(), Some("PartitionKey,RowKey,Timestamp,keep,keep@type"));
    assert_eq!(stats.columns, 5);
}
