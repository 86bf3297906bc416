//! Pure mapping from validated Notfis structures to storage DTOs.
//!
//! Nothing here fails: absent or unparseable numeric strings simply leave the
//! derived field empty.

use freightdoc_core::notfis::{Actor, Manifest, MinutaHeader, NotaFiscalItem};
use freightdoc_core::types::DbId;
use freightdoc_db::models::invoice::CreateShipmentInvoice;
use freightdoc_db::models::shipment::{ActorColumns, CreateShipment};

/// Flatten a manifest header and its actors into a shipment row.
pub fn manifest_to_shipment(
    header: &MinutaHeader,
    rem: &Actor,
    dest: &Actor,
    toma: Option<&Actor>,
    receb: Option<&Actor>,
    raw_payload: Option<&str>,
) -> CreateShipment {
    let carga = &header.carga;
    CreateShipment {
        service_code: header
            .c_serv
            .as_ref()
            .map(|code| code.to_string().trim().to_string())
            .unwrap_or_default(),
        c_tab: header.c_tab.clone(),
        tp_emi: header.tp_emi,
        emission_status: header.c_status.unwrap_or_default(),
        c_aut: header.c_aut.clone(),
        n_doc_emit: header.n_doc_emit.clone(),
        d_emi: header.d_emi.clone(),
        toma: header.toma.clone(),
        pbru: carga.p_bru.clone(),
        pcub: carga.p_cub.clone(),
        qvol: carga.q_vol.clone(),
        vtot: carga.v_tot.clone(),
        c_orig_calc: header.origin_code().map(str::to_string),
        c_dest_calc: header.destination_code().map(str::to_string),
        rem: actor_columns(rem),
        dest: actor_columns(dest),
        tomador: toma.map(actor_columns).unwrap_or_default(),
        recebedor: receb.map(actor_columns).unwrap_or_default(),
        total_weight: carga.p_bru.as_deref().and_then(parse_decimal),
        total_value: carga.v_tot.as_deref().and_then(parse_decimal),
        volumes_qty: carga.q_vol.as_deref().and_then(parse_count),
        raw_payload: raw_payload.map(str::to_string),
    }
}

/// Convenience wrapper over [`manifest_to_shipment`] for a whole manifest.
pub fn shipment_from_manifest(manifest: &Manifest, raw_payload: Option<&str>) -> CreateShipment {
    manifest_to_shipment(
        &manifest.minuta,
        &manifest.rem,
        &manifest.dest,
        manifest.toma.as_ref(),
        manifest.receb.as_ref(),
        raw_payload,
    )
}

/// Map one invoice. `remetente_ndoc` comes only from the invoice's own
/// nested sender; falling back to the shipment sender is the caller's call.
pub fn nota_to_invoice(nota: &NotaFiscalItem, shipment_id: DbId) -> CreateShipmentInvoice {
    CreateShipmentInvoice {
        shipment_id,
        n_ped: nota.n_ped.clone(),
        invoice_series: nota.serie.clone(),
        invoice_number: nota.n_doc.clone(),
        d_emi: nota.d_emi.clone(),
        v_bc: nota.v_bc.clone(),
        v_icms: nota.v_icms.clone(),
        v_bcst: nota.v_bcst.clone(),
        v_st: nota.v_st.clone(),
        v_prod: nota.v_prod.clone(),
        invoice_value: nota.v_nf.as_ref().and_then(|v| v.as_f64()),
        ncfop: nota.n_cfop.clone(),
        pbru: nota.p_bru.clone(),
        qvol: nota.q_vol.clone(),
        access_key: nota.chave.clone(),
        tp_doc: nota.tp_doc.clone(),
        x_esp: nota.x_esp.clone(),
        x_nat: nota.x_nat.clone(),
        cte_chave: nota.cte.as_ref().and_then(|cte| cte.chave.clone()),
        remetente_ndoc: nota.rem.as_ref().and_then(|rem| rem.n_doc.clone()),
        xmls_b64: nota.xmls_b64.clone(),
    }
}

pub fn actor_columns(actor: &Actor) -> ActorColumns {
    ActorColumns {
        ndoc: actor.n_doc.clone(),
        ie: actor.ie.clone(),
        cfiscal: actor.c_fiscal,
        xnome: actor.x_nome.clone(),
        xfant: actor.x_fant.clone(),
        xlgr: actor.x_lgr.clone(),
        nro: actor.nro.clone(),
        xcpl: actor.x_cpl.clone(),
        xbairro: actor.x_bairro.clone(),
        cmun: actor.c_mun.clone(),
        cep: actor.cep.clone(),
        cpais: actor.c_pais,
        nfone: actor.n_fone.clone(),
        email: actor.email.clone(),
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whole counts, accepting `"2"` and `"2.0"`.
fn parse_count(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(i32::MAX))
            .map(|v| v as i32)
    })
}
