use leaf_adapters::mongo::{MongoCatalog, MongoCollectionSource, MongoConnectionBackend};
use leaf_core::catalog::{collection_names, database_names};
use leaf_core::connection_manager::ConnectionManager;
use leaf_core::data_source::DataSource;
use leaf_core::document::FieldValue;
use leaf_core::mutation::{execute_mutation, MutationCommand};
use leaf_core::profiles::ConnectionProfile;
use leaf_core::query::{build_query, SearchScope, SortSpec};
use leaf_core::sequencer::{fetch_page, LoadRequest, RequestSequencer};
use mongodb::bson::{doc, Document};

const DATABASE: &str = "leaf_adapters_it";
const COLLECTION: &str = "people";

fn mongo_integration_enabled() -> bool {
    matches!(
        std::env::var("LEAF_RUN_MONGO_INTEGRATION").ok().as_deref(),
        Some("1")
    )
}

fn integration_profile() -> ConnectionProfile {
    let url = std::env::var("LEAF_TEST_MONGO_URL")
        .unwrap_or_else(|_| "mongodb://127.0.0.1:27017".to_string());
    ConnectionProfile::new("adapters-integration", url)
}

#[tokio::test(flavor = "current_thread")]
async fn mongo_backend_catalog_paging_and_mutation_paths() {
    if !mongo_integration_enabled() {
        return;
    }

    let mut manager = ConnectionManager::new(MongoConnectionBackend);
    manager
        .connect(integration_profile())
        .await
        .expect("connect should succeed");
    let client = manager
        .connection()
        .cloned()
        .expect("connected client expected");

    let database = client.database(DATABASE);
    database.drop().await.expect("drop should succeed");
    let people = (1..=23)
        .map(|index| {
            doc! {
                "_id": index,
                "name": format!("person-{index}"),
                "age": 20 + index,
                "active": true,
            }
        })
        .collect::<Vec<Document>>();
    database
        .collection::<Document>(COLLECTION)
        .insert_many(people)
        .await
        .expect("seed insert should succeed");

    let catalog = MongoCatalog::new(client.clone());
    let databases = database_names(&catalog).await.expect("databases listed");
    assert!(databases.iter().any(|name| name == DATABASE));
    let collections = collection_names(&catalog, DATABASE)
        .await
        .expect("collections listed");
    assert_eq!(collections, [COLLECTION]);

    let source = MongoCollectionSource::new(&client, DATABASE, COLLECTION);
    let mut sequencer = RequestSequencer::new();
    let request = LoadRequest {
        token: sequencer.mint(),
        query: build_query(&[], &SearchScope::AllFields, ""),
        sort: SortSpec::default(),
        page_index: 2,
        skip: 20,
        limit: 10,
    };
    let page = fetch_page(&source, &request)
        .await
        .result
        .expect("last page should load");
    assert_eq!(page.total_count, 23);
    assert_eq!(page.documents.len(), 3);
    assert_eq!(page.documents[0].id(), Some(&FieldValue::Int(21)));

    let fields = vec!["name".to_string(), "age".to_string()];
    let by_age = build_query(&fields, &SearchScope::Field("age".to_string()), "30");
    assert_eq!(source.count(&by_age).await.expect("count"), 1);
    let by_name = build_query(&fields, &SearchScope::AllFields, "PERSON-2");
    assert_eq!(source.count(&by_name).await.expect("count"), 5);

    let edit = execute_mutation(
        &source,
        MutationCommand::edit(FieldValue::Int(1), "active", "false"),
    )
    .await;
    assert!(edit.result.is_ok());
    let stored = database
        .collection::<Document>(COLLECTION)
        .find_one(doc! { "_id": 1 })
        .await
        .expect("find_one should succeed")
        .expect("document 1 exists");
    assert!(matches!(stored.get_bool("active"), Ok(false)));

    let delete = execute_mutation(&source, MutationCommand::delete(FieldValue::Int(1))).await;
    assert!(delete.result.is_ok());
    assert_eq!(
        source
            .count(&build_query(&[], &SearchScope::AllFields, ""))
            .await
            .expect("count"),
        22
    );
    let missing = execute_mutation(&source, MutationCommand::delete(FieldValue::Int(1))).await;
    assert!(missing.result.is_err());

    database.drop().await.expect("cleanup drop should succeed");
    manager
        .disconnect()
        .await
        .expect("disconnect should succeed");
}
