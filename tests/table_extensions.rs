use table_storage_ext::domains::table::TABLE_NAME_COLUMN;
use table_storage_ext::{
    Entity, ExtensionsConfig, Filter, InMemoryTable, InMemoryTableStore, TableExtensions, TableServiceClient,
    TableServiceExtensions, TransactionActionType,
};
use uuid::Uuid;

fn random_table_name() -> String {
    format!("t{}", Uuid::new_v4().simple())
}

async fn setup() -> (InMemoryTableStore, TableExtensions<InMemoryTable>) {
    let store = InMemoryTableStore::new();
    let service = TableServiceExtensions::with_config(store.clone(), ExtensionsConfig::default());
    let name = random_table_name();
    service.create_table_if_not_exists_safe(&name).await.unwrap();
    (store, service.table(&name))
}

/// 3000 entities in partition "123" plus three singletons
async fn create_test_data(table: &TableExtensions<InMemoryTable>) {
    let entities: Vec<Entity> = (0..3000)
        .map(|_| Entity::new("123", Uuid::new_v4().to_string()).with("Test", Uuid::new_v4().to_string()))
        .collect();
    table.add_entities(entities, TransactionActionType::Add).await.unwrap();

    let singletons = vec![Entity::new("1", "2"), Entity::new("2", "2"), Entity::new("3", "4")];
    table
        .add_entities(singletons, TransactionActionType::UpsertReplace)
        .await
        .unwrap();
}

#[tokio::test]
async fn get_all_entities() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.get_all_entities().await.unwrap().len(), 3003);
}

#[tokio::test]
async fn get_entities_by_row_key() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.get_all_entities_by_row_key("2").await.unwrap().len(), 2);
    assert!(table
        .get_all_entities_by_row_key(&Uuid::new_v4().to_string())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn get_entities_by_partition_key() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.get_all_entities_by_partition_key("123").await.unwrap().len(), 3000);
    assert_eq!(table.get_all_entities_by_partition_key("2").await.unwrap().len(), 1);
    assert!(table
        .get_all_entities_by_partition_key(&Uuid::new_v4().to_string())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn get_first_entity() {
    let (_store, table) = setup().await;
    assert!(table.get_first_entity().await.unwrap().is_none());
    create_test_data(&table).await;
    assert!(table.get_first_entity().await.unwrap().is_some());
    assert!(table.get_first_entity_in_partition("123").await.unwrap().is_some());
    assert!(table
        .get_first_entity_in_partition(&Uuid::new_v4().to_string())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn add_entities_across_partitions() {
    let (store, table) = setup().await;
    let entities: Vec<Entity> = (0..1000)
        .map(|i| Entity::new((i % 20).to_string(), Uuid::new_v4().to_string()))
        .collect();
    let results = table.add_entities(entities, TransactionActionType::Add).await.unwrap();

    // 20 partitions of 50 entities, one chunk each
    assert_eq!(results.len(), 20);
    let log = store.transaction_log().await;
    assert!(log.iter().all(|t| t.action_count == 50));
    assert_eq!(table.count_entities(None).await.unwrap(), 1000);
}

#[tokio::test]
async fn add_entities_splits_large_partition() {
    let (store, table) = setup().await;
    let entities: Vec<Entity> = (0..150).map(|i| Entity::new("123", format!("{:03}", i))).collect();
    table.add_entities(entities, TransactionActionType::Add).await.unwrap();

    let sizes: Vec<usize> = store.transaction_log().await.iter().map(|t| t.action_count).collect();
    assert_eq!(sizes, vec![100, 50]);
}

#[tokio::test]
async fn delete_all_entities() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.delete_all_entities().await.unwrap(), 3003);
    assert!(table.get_all_entities().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_all_entities_by_partition_key() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.delete_all_entities_by_partition_key("123").await.unwrap(), 3000);
    assert!(table.get_all_entities_by_partition_key("123").await.unwrap().is_empty());
    assert_eq!(table.count_entities(None).await.unwrap(), 3);
}

#[tokio::test]
async fn create_table_if_not_exists_safe() {
    let store = InMemoryTableStore::new();
    let service = TableServiceExtensions::with_config(store.clone(), ExtensionsConfig::default());
    let filter = Filter::equals(TABLE_NAME_COLUMN, "testtableasync");
    assert!(store.query_tables(Some(&filter)).await.unwrap().is_empty());

    service.create_table_if_not_exists_safe("testtableasync").await.unwrap();
    service.create_table_if_not_exists_safe("testtableasync").await.unwrap();
    assert_eq!(store.query_tables(Some(&filter)).await.unwrap().len(), 1);

    store.delete_table("testtableasync").await.unwrap();
    assert!(store.query_tables(Some(&filter)).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_all_entities_starting_with() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    for (prefix, expected) in [("123", 3000), ("1", 3001), ("2", 1)] {
        let found = table.get_all_entities_starting_with("PartitionKey", prefix).await.unwrap();
        assert_eq!(found.len(), expected, "prefix {}", prefix);
    }
}

#[tokio::test]
async fn count_entities() {
    let (_store, table) = setup().await;
    create_test_data(&table).await;
    assert_eq!(table.count_entities(None).await.unwrap(), 3003);
    assert_eq!(table.count_entities(Some("123")).await.unwrap(), 3000);
}

#[tokio::test]
async fn small_page_size_still_reads_everything() {
    let store = InMemoryTableStore::new();
    let config = ExtensionsConfig {
        page_size: 7,
        ..ExtensionsConfig::default()
    };
    let service = TableServiceExtensions::with_config(store, config);
    service.create_table_if_not_exists_safe("pagedtable").await.unwrap();
    let table = service.table("pagedtable");

    let entities: Vec<Entity> = (0..50).map(|i| Entity::new("p", format!("{:02}", i))).collect();
    table.add_entities(entities, TransactionActionType::Add).await.unwrap();

    let all = table.get_all_entities().await.unwrap();
    let keys: Vec<String> = all.iter().map(|e| e.row_key.clone()).collect();
    let expected: Vec<String> = (0..50).map(|i| format!("{:02}", i)).collect();
    assert_eq!(keys, expected);
    assert_eq!(table.delete_all_entities().await.unwrap(), 50);
}
