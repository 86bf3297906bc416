//! The pipeline over a real PostgreSQL connection.

mod common;

use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use common::{access_key, invoice, manifest, manifest_with};
use freightdoc_db::models::invoice::CreateShipmentInvoice;
use freightdoc_db::repositories::{InvoiceRepo, ShipmentRepo};
use freightdoc_pipeline::geography::PgGeographyResolver;
use freightdoc_pipeline::mapper::shipment_from_manifest;
use freightdoc_pipeline::orchestrator::validate_manifest;
use freightdoc_pipeline::store::{PgShipmentStore, ShipmentStore, StoreError};
use freightdoc_pipeline::IngestionService;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

fn pg_service(store: PgShipmentStore) -> IngestionService<PgShipmentStore, PgGeographyResolver> {
    let resolver = store.geography();
    IngestionService::new(store, resolver)
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn failed_invoice_keeps_its_siblings(pool: PgPool) {
    let raw = manifest_with(vec![
        invoice("1", &access_key(1)),
        invoice("2", "0123456789"),
        invoice("3", &access_key(3)),
    ]);

    let store = PgShipmentStore::acquire(&pool).await.unwrap();
    let mut service = pg_service(store);
    let result = service.process_manifest(0, &raw).await;
    drop(service);

    assert_eq!(result.status, 1);
    assert_eq!(result.invoice_count, Some(2));
    assert_eq!(result.invoice_failures, Some(1));

    let shipment_id = result.id.unwrap();
    let stored = InvoiceRepo::list_by_shipment(&pool, shipment_id).await.unwrap();
    let numbers: Vec<_> = stored
        .iter()
        .map(|i| i.invoice_number.as_deref().unwrap())
        .collect();
    assert_eq!(numbers, ["1", "3"]);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn constraint_violation_rolls_back_to_savepoint_only(pool: PgPool) {
    let parsed = validate_manifest(&manifest(1)).unwrap();
    let mut store = PgShipmentStore::acquire(&pool).await.unwrap();

    store.begin().await.unwrap();
    let shipment_id = store
        .insert_shipment(&shipment_from_manifest(&parsed, None))
        .await
        .unwrap();

    // The access key CHECK rejects this row inside the database and aborts
    // the transaction up to the savepoint.
    let savepoint = store.savepoint().await.unwrap();
    let rejected = store
        .insert_invoice(&CreateShipmentInvoice {
            shipment_id,
            invoice_number: Some("bad".into()),
            access_key: Some("short".into()),
            ..Default::default()
        })
        .await;
    assert_matches!(rejected, Err(StoreError::Database(sqlx::Error::Database(_))));
    store.rollback_to_savepoint(savepoint).await.unwrap();

    let savepoint = store.savepoint().await.unwrap();
    store
        .insert_invoice(&CreateShipmentInvoice {
            shipment_id,
            invoice_number: Some("good".into()),
            access_key: Some(access_key(9)),
            ..Default::default()
        })
        .await
        .unwrap();
    store.release_savepoint(savepoint).await.unwrap();
    store.commit().await.unwrap();
    drop(store);

    let stored = InvoiceRepo::list_by_shipment(&pool, shipment_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].invoice_number.as_deref(), Some("good"));
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn dropping_an_open_transaction_discards_it(pool: PgPool) {
    let parsed = validate_manifest(&manifest(1)).unwrap();
    let mut store = PgShipmentStore::acquire(&pool).await.unwrap();
    store.begin().await.unwrap();
    store
        .insert_shipment(&shipment_from_manifest(&parsed, None))
        .await
        .unwrap();
    drop(store);

    assert_eq!(ShipmentRepo::count(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn batch_runs_on_a_single_connection(
    pool_opts: PgPoolOptions,
    connect_opts: PgConnectOptions,
) {
    let acquire_timeout = Duration::from_secs(2);
    let pool = pool_opts
        .max_connections(1)
        .acquire_timeout(acquire_timeout)
        .connect_with(connect_opts)
        .await
        .unwrap();

    let store = PgShipmentStore::acquire(&pool).await.unwrap();
    let mut service = pg_service(store);

    let started = Instant::now();
    let result = service.process_manifest(0, &manifest(1)).await;
    let elapsed = started.elapsed();
    drop(service);

    assert_eq!(result.status, 1, "{}", result.message);
    assert!(elapsed < acquire_timeout, "ingestion waited on the pool: {elapsed:?}");

    // Seeded capitals: São Paulo sends, Rio de Janeiro receives.
    let shipment = ShipmentRepo::find_by_id(&pool, result.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(shipment.locations.rem.uf.as_deref(), Some("SP"));
    assert_eq!(shipment.locations.rem.municipio_codigo_ibge, Some(3550308));
    assert_eq!(shipment.locations.dest.uf.as_deref(), Some("RJ"));
    assert_eq!(shipment.locations.destino.municipio_codigo_ibge, Some(3304557));
}
