//! Ingestion orchestrator.
//!
//! Manifests are processed one after the other, each in its own transaction:
//!
//! 1. decode and validate the manifest;
//! 2. `BEGIN`, insert the shipment;
//! 3. resolve and store locations inside a savepoint, swallowing any failure;
//! 4. insert every invoice inside its own savepoint, counting failures;
//! 5. `COMMIT`.
//!
//! Any error in steps 2-5 rolls the manifest back and is reported in its
//! result record. Sibling manifests are never affected.

use std::str::FromStr;

use freightdoc_core::notfis::{
    describe_validation_errors, parse_manifest, service_code, Manifest, NotaFiscalItem,
    NotfisBatch,
};
use freightdoc_core::types::DbId;
use freightdoc_db::models::shipment::LocationColumns;
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::aggregator::{BatchResponse, ManifestResult};
use crate::error::IngestError;
use crate::geography::{location_sources, GeographyResolver};
use crate::mapper;
use crate::store::ShipmentStore;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do with a manifest whose invoices all failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyShipmentPolicy {
    /// Commit the shipment anyway and report the failures.
    #[default]
    Commit,
    /// Roll the manifest back and report it as failed.
    Reject,
}

impl FromStr for EmptyShipmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commit" => Ok(Self::Commit),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown empty shipment policy '{other}', expected 'commit' or 'reject'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of one manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestState {
    Pending,
    InTransaction,
    Committed,
    RolledBack,
}

/// Invoice counters for one manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceCounts {
    pub succeeded: u32,
    pub failed: u32,
}

#[derive(Debug)]
struct Ingested {
    shipment_id: DbId,
    counts: InvoiceCounts,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Runs a batch of manifests against a store and a geography resolver.
///
/// The store is expected to be built for a single request and is consumed
/// sequentially; nothing here is shared between requests.
pub struct IngestionService<S, G> {
    store: S,
    resolver: G,
    policy: EmptyShipmentPolicy,
    cancel: Option<CancellationToken>,
}

impl<S, G> IngestionService<S, G>
where
    S: ShipmentStore,
    G: GeographyResolver,
{
    pub fn new(store: S, resolver: G) -> Self {
        Self {
            store,
            resolver,
            policy: EmptyShipmentPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: EmptyShipmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop before the next manifest once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Give the store back, mainly for inspection in tests.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Process every manifest of the batch and aggregate the results.
    pub async fn process_batch(&mut self, batch: &NotfisBatch) -> BatchResponse {
        tracing::debug!(manifests = batch.documentos.len(), "Batch processing started");

        let mut results = Vec::with_capacity(batch.documentos.len());
        for (index, raw) in batch.documentos.iter().enumerate() {
            if self.is_cancelled() {
                tracing::warn!(manifest_index = index, "Batch cancelled, skipping manifest");
                results.push(ManifestResult::failed(&IngestError::unclassified(
                    "Cancelled",
                    "request cancelled before this manifest was processed",
                )));
                continue;
            }
            results.push(self.process_manifest(index, raw).await);
        }

        let response = BatchResponse::from_results(results);
        tracing::debug!(
            succeeded = response.data.iter().filter(|r| r.is_success()).count(),
            failed = response.data.iter().filter(|r| !r.is_success()).count(),
            "Batch processing completed",
        );
        response
    }

    /// Process one manifest in its own transaction.
    pub async fn process_manifest(
        &mut self,
        index: usize,
        raw: &serde_json::Value,
    ) -> ManifestResult {
        tracing::info!(manifest_index = index, payload = %raw, "Manifest received");

        let manifest = match validate_manifest(raw) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::warn!(manifest_index = index, error = %err, "Manifest rejected");
                return ManifestResult::failed(&err);
            }
        };

        let mut state = ManifestState::Pending;
        match self.ingest(index, &manifest, raw, &mut state).await {
            Ok(ingested) => {
                tracing::debug!(
                    manifest_index = index,
                    shipment_id = ingested.shipment_id,
                    invoices_ok = ingested.counts.succeeded,
                    invoices_failed = ingested.counts.failed,
                    "Manifest committed",
                );
                ManifestResult::committed(
                    ingested.shipment_id,
                    ingested.counts.succeeded,
                    ingested.counts.failed,
                )
            }
            Err(err) => {
                if state == ManifestState::InTransaction {
                    if let Err(rollback_err) = self.store.rollback().await {
                        tracing::warn!(
                            manifest_index = index,
                            error = %rollback_err,
                            "Rollback failed",
                        );
                    }
                    state = ManifestState::RolledBack;
                }
                tracing::warn!(
                    manifest_index = index,
                    kind = err.kind(),
                    error = %err,
                    ?state,
                    "Manifest failed",
                );
                ManifestResult::failed(&err)
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    async fn ingest(
        &mut self,
        index: usize,
        manifest: &Manifest,
        raw: &serde_json::Value,
        state: &mut ManifestState,
    ) -> Result<Ingested, IngestError> {
        let raw_payload = serde_json::to_string(raw)
            .map_err(|e| IngestError::unclassified("SerializationError", e.to_string()))?;
        let shipment = mapper::shipment_from_manifest(manifest, Some(&raw_payload));

        self.store.begin().await?;
        *state = ManifestState::InTransaction;

        let shipment_id = self.store.insert_shipment(&shipment).await?;
        tracing::debug!(
            manifest_index = index,
            shipment_id,
            service_code = %shipment.service_code,
            "Shipment created",
        );

        self.enrich(shipment_id, manifest).await?;

        let counts = self
            .insert_invoices(shipment_id, &manifest.documentos, shipment.rem.ndoc.as_deref())
            .await?;

        if counts.succeeded == 0 && self.policy == EmptyShipmentPolicy::Reject {
            return Err(IngestError::Validation(format!(
                "no invoice could be saved ({} failed)",
                counts.failed
            )));
        }

        self.store
            .commit()
            .await
            .map_err(|e| IngestError::Persistence(format!("commit failed: {e}")))?;
        *state = ManifestState::Committed;

        Ok(Ingested {
            shipment_id,
            counts,
        })
    }

    /// Best-effort location enrichment inside its own savepoint.
    ///
    /// Lookup and update failures are logged and rolled back. Only a failure
    /// of the savepoint machinery itself is returned.
    async fn enrich(&mut self, shipment_id: DbId, manifest: &Manifest) -> Result<(), IngestError> {
        let savepoint = self.store.savepoint().await?;
        match self.resolve_locations(shipment_id, manifest).await {
            Ok(resolved) => {
                self.store.release_savepoint(savepoint).await?;
                tracing::debug!(shipment_id, resolved, "Locations enriched");
            }
            Err(err) => {
                tracing::warn!(
                    shipment_id,
                    error = %err,
                    "Location enrichment failed, continuing without it",
                );
                self.store.rollback_to_savepoint(savepoint).await?;
            }
        }
        Ok(())
    }

    async fn resolve_locations(
        &mut self,
        shipment_id: DbId,
        manifest: &Manifest,
    ) -> Result<usize, IngestError> {
        let mut resolved = Vec::new();
        for (role, code) in location_sources(manifest) {
            let found = self
                .resolver
                .resolve(&code)
                .await
                .map_err(|e| IngestError::Enrichment(format!("{role} ({code}): {e}")))?;
            match found {
                Some(municipality) => {
                    resolved.push((role, LocationColumns::from(&municipality)));
                }
                None => tracing::debug!(shipment_id, %role, %code, "Location code not found"),
            }
        }
        if !resolved.is_empty() {
            self.store
                .update_locations(shipment_id, &resolved)
                .await
                .map_err(|e| IngestError::Enrichment(e.to_string()))?;
        }
        Ok(resolved.len())
    }

    /// Insert every invoice in its own savepoint.
    async fn insert_invoices(
        &mut self,
        shipment_id: DbId,
        items: &[NotaFiscalItem],
        shipment_sender: Option<&str>,
    ) -> Result<InvoiceCounts, IngestError> {
        let mut counts = InvoiceCounts::default();
        for (item_index, item) in items.iter().enumerate() {
            let savepoint = self.store.savepoint().await?;
            match self.insert_invoice(shipment_id, item, shipment_sender).await {
                Ok(invoice_id) => {
                    self.store.release_savepoint(savepoint).await?;
                    counts.succeeded += 1;
                    tracing::debug!(shipment_id, item_index, invoice_id, "Invoice created");
                }
                Err(err) => {
                    self.store.rollback_to_savepoint(savepoint).await?;
                    counts.failed += 1;
                    tracing::warn!(
                        shipment_id,
                        item_index,
                        error = %err,
                        "Invoice failed, continuing with the next one",
                    );
                }
            }
        }
        Ok(counts)
    }

    async fn insert_invoice(
        &mut self,
        shipment_id: DbId,
        item: &NotaFiscalItem,
        shipment_sender: Option<&str>,
    ) -> Result<DbId, IngestError> {
        validate_invoice(item)?;
        let mut invoice = mapper::nota_to_invoice(item, shipment_id);
        if invoice.remetente_ndoc.is_none() {
            invoice.remetente_ndoc = shipment_sender.map(str::to_string);
        }
        Ok(self.store.insert_invoice(&invoice).await?)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Decode and validate a manifest, then re-check the invariants the
/// transaction relies on.
pub fn validate_manifest(raw: &serde_json::Value) -> Result<Manifest, IngestError> {
    let manifest = parse_manifest(raw)?;
    if manifest.documentos.is_empty() {
        return Err(IngestError::Validation("manifest has no invoices".into()));
    }
    if service_code(&manifest.minuta).is_none() {
        return Err(IngestError::Validation(
            "cServ must be between 1 and 99".into(),
        ));
    }
    Ok(manifest)
}

/// Per-invoice rules: invoice number present, 44-character access key.
pub fn validate_invoice(item: &NotaFiscalItem) -> Result<(), IngestError> {
    item.validate()
        .map_err(|errors| IngestError::Validation(describe_validation_errors(&errors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::{MockGeographyResolver, ResolveError};
    use crate::memory::MemoryStore;
    use freightdoc_core::geography::{LocationRole, Municipality};
    use serde_json::json;

    fn manifest(chaves: &[&str]) -> serde_json::Value {
        let actor = json!({
            "nDoc": "11111111000111", "IE": "ISENTO", "cFiscal": 1, "xNome": "ACME",
            "xFant": "ACME", "xLgr": "RUA", "nro": "1", "xBairro": "CENTRO",
            "cMun": "3550308", "CEP": "01001000", "cPais": 1058
        });
        let documentos: Vec<_> = chaves
            .iter()
            .enumerate()
            .map(|(i, chave)| json!({ "nDoc": format!("{}", i + 1), "chave": chave }))
            .collect();
        json!({
            "minuta": {
                "toma": "0", "nDocEmit": "11111111000111", "dEmi": "2026-01-23",
                "cServ": "1", "cTab": "T", "tpEmi": 1, "cStatus": 0, "cAut": "A",
                "carga": { "pBru": "10.5", "pCub": "1", "qVol": "2", "vTot": "100" },
                "cOrigCalc": "3550308", "cDestCalc": "3304557"
            },
            "rem": actor.clone(),
            "dest": actor,
            "documentos": documentos
        })
    }

    fn sao_paulo() -> Municipality {
        Municipality {
            codigo_ibge: 3550308,
            nome: "São Paulo".into(),
            estado_codigo_ibge: Some(35),
            estado_sigla: Some("SP".into()),
        }
    }

    fn key() -> String {
        "1".repeat(44)
    }

    #[tokio::test]
    async fn resolver_errors_never_fail_the_manifest() {
        let mut resolver = MockGeographyResolver::new();
        resolver
            .expect_resolve()
            .returning(|_| Err(ResolveError::Unavailable("down".into())));

        let mut service = IngestionService::new(MemoryStore::new(), resolver);
        let result = service.process_manifest(0, &manifest(&[&key()])).await;

        assert_eq!(result.status, 1, "{}", result.message);
        let store = service.into_store();
        let id = result.id.unwrap();
        assert!(store.shipment(id).unwrap().locations.origem.is_empty());
        assert_eq!(store.invoices_of(id).len(), 1);
    }

    #[tokio::test]
    async fn resolved_codes_are_stored_and_unknown_codes_skipped() {
        let mut resolver = MockGeographyResolver::new();
        resolver
            .expect_resolve()
            .returning(|code| Ok((code == "3550308").then(sao_paulo)));

        let mut service = IngestionService::new(MemoryStore::new(), resolver);
        let result = service.process_manifest(0, &manifest(&[&key()])).await;
        let store = service.into_store();
        let locations = &store.shipment(result.id.unwrap()).unwrap().locations;

        assert_eq!(locations.get(LocationRole::Sender).uf.as_deref(), Some("SP"));
        assert_eq!(
            locations.get(LocationRole::Origin).municipio_codigo_ibge,
            Some(3550308)
        );
        assert!(locations.get(LocationRole::Destination).is_empty());
    }

    #[tokio::test]
    async fn failed_location_write_is_rolled_back() {
        let mut resolver = MockGeographyResolver::new();
        resolver.expect_resolve().returning(|_| Ok(Some(sao_paulo())));

        let store = MemoryStore::new().failing_location_update();
        let mut service = IngestionService::new(store, resolver);
        let result = service.process_manifest(0, &manifest(&[&key()])).await;

        assert_eq!(result.status, 1);
        let store = service.into_store();
        assert!(store.shipment(result.id.unwrap()).unwrap().locations.rem.is_empty());
    }

    #[tokio::test]
    async fn invalid_manifest_never_reaches_the_resolver() {
        let mut resolver = MockGeographyResolver::new();
        resolver.expect_resolve().times(0);

        let mut raw = manifest(&[&key()]);
        raw["minuta"]["cServ"] = json!("abc");
        let mut service = IngestionService::new(MemoryStore::new(), resolver);
        let result = service.process_manifest(0, &raw).await;

        assert_eq!(result.status, 0);
        assert!(result.message.contains("validation"));
        assert!(!service.into_store().in_transaction());
    }

    #[test]
    fn policy_parses_from_config_values() {
        assert_eq!(
            "commit".parse::<EmptyShipmentPolicy>(),
            Ok(EmptyShipmentPolicy::Commit)
        );
        assert_eq!(
            " Reject ".parse::<EmptyShipmentPolicy>(),
            Ok(EmptyShipmentPolicy::Reject)
        );
        assert!("drop".parse::<EmptyShipmentPolicy>().is_err());
    }

    #[test]
    fn invoice_rules() {
        let ok = NotaFiscalItem {
            n_doc: Some("1".into()),
            chave: Some(key()),
            ..Default::default()
        };
        assert!(validate_invoice(&ok).is_ok());

        let short = NotaFiscalItem {
            chave: Some("0123456789".into()),
            ..ok.clone()
        };
        let err = validate_invoice(&short).unwrap_err();
        assert!(err.to_string().starts_with("validation error:"));
    }
}
