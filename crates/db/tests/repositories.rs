//! Repository round trips against a real database.
//!
//! Run with `DATABASE_URL` set and `cargo test -- --ignored`.

use freightdoc_core::geography::{LocationRole, Municipality};
use freightdoc_db::models::invoice::CreateShipmentInvoice;
use freightdoc_db::models::prefat::CreatePrefat;
use freightdoc_db::models::shipment::{
    ActorColumns, CreateShipment, LocationColumns, UpdateShipmentStatus,
};
use freightdoc_db::repositories::{InvoiceRepo, LocalityRepo, PrefatRepo, ShipmentRepo};
use sqlx::PgPool;

fn shipment() -> CreateShipment {
    CreateShipment {
        service_code: "1".into(),
        emission_status: 0,
        rem: ActorColumns {
            ndoc: Some("11111111000111".into()),
            xnome: Some("REMETENTE".into()),
            ..Default::default()
        },
        total_weight: Some(100.5),
        volumes_qty: Some(10),
        ..Default::default()
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn shipment_and_invoices_round_trip(pool: PgPool) {
    let id = ShipmentRepo::create(&pool, &shipment()).await.unwrap();

    let invoice = CreateShipmentInvoice {
        shipment_id: id,
        invoice_number: Some("12345".into()),
        access_key: Some("1".repeat(44)),
        ..Default::default()
    };
    InvoiceRepo::create(&pool, &invoice).await.unwrap();

    let stored = ShipmentRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.rem.xnome.as_deref(), Some("REMETENTE"));
    assert!(stored.tomador.is_empty());

    let invoices = InvoiceRepo::list_by_shipment(&pool, id).await.unwrap();
    assert_eq!(invoices.len(), 1);

    let listed = ShipmentRepo::list(&pool, 10, 0).await.unwrap();
    assert_eq!(listed[0].invoice_count, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn short_access_key_violates_check(pool: PgPool) {
    let id = ShipmentRepo::create(&pool, &shipment()).await.unwrap();
    let invoice = CreateShipmentInvoice {
        shipment_id: id,
        access_key: Some("123".into()),
        ..Default::default()
    };
    assert!(InvoiceRepo::create(&pool, &invoice).await.is_err());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn locations_and_status_updates(pool: PgPool) {
    let id = ShipmentRepo::create(&pool, &shipment()).await.unwrap();

    let sp = LocalityRepo::find_municipio_by_codigo(&pool, 3550308)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sp.estado_sigla.as_deref(), Some("SP"));

    let municipality: Municipality = sp.into();
    let location = LocationColumns::from(&municipality);
    let updated = ShipmentRepo::update_locations(&pool, id, &[(LocationRole::Origin, location)])
        .await
        .unwrap();
    assert!(updated);

    let change = UpdateShipmentStatus {
        status: serde_json::json!({ "code": "1", "message": "delivered", "type": "delivered" }),
        recebedor: Some(ActorColumns {
            xnome: Some("PORTEIRO".into()),
            ..Default::default()
        }),
    };
    let stored = ShipmentRepo::update_status(&pool, id, &change)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.locations.origem.uf.as_deref(), Some("SP"));
    assert_eq!(stored.recebedor.xnome.as_deref(), Some("PORTEIRO"));
    assert_eq!(stored.status.unwrap()["code"], "1");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn seeded_states_are_listed(pool: PgPool) {
    let estados = LocalityRepo::list_estados(&pool).await.unwrap();
    assert_eq!(estados.len(), 27);
    let sp = LocalityRepo::find_estado_by_sigla(&pool, "SP")
        .await
        .unwrap()
        .unwrap();
    let municipios = LocalityRepo::list_municipios_by_estado(&pool, sp.id)
        .await
        .unwrap();
    assert!(municipios.iter().any(|m| m.codigo_ibge == 3550308));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn prefats_are_listed_newest_first(pool: PgPool) {
    for n in 1..=3 {
        PrefatRepo::create(
            &pool,
            &CreatePrefat {
                layout: "PROCEDA50".into(),
                source_url: format!("https://edi.example/{n}.txt"),
                prefat_base64: "MDAw".into(),
                size_bytes: 3,
            },
        )
        .await
        .unwrap();
    }

    assert_eq!(PrefatRepo::count(&pool).await.unwrap(), 3);
    let page = PrefatRepo::list(&pool, 2, 0).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page[0].id > page[1].id);

    let first = PrefatRepo::find_by_id(&pool, page[0].id).await.unwrap().unwrap();
    assert_eq!(first.source_url, "https://edi.example/3.txt");
    assert!(PrefatRepo::find_by_id(&pool, -1).await.unwrap().is_none());
}
