//! Notfis manifest ("minuta") payload model and structural validation.
//!
//! A batch arrives as `{ "documentos": [ ... ] }`. Each entry is decoded and
//! validated on its own so that one malformed manifest is reported without
//! rejecting its siblings. Line items (`documentos` inside a manifest) are
//! validated later, one at a time, by the ingestion pipeline: a bad invoice
//! only fails that invoice.
//!
//! Field names on the wire follow the Notfis layout (`nDoc`, `cMun`, `vNF`,
//! ...). Most fields are optional at the type level; which ones are mandatory
//! is expressed through `validator` rules so that downstream mapping never has
//! to deal with a missing attribute.

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::geography::MUNICIPALITY_CODE_DIGITS;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Exact length of an NF-e / CT-e access key.
pub const ACCESS_KEY_LENGTH: usize = 44;

/// Smallest accepted service code (`cServ`).
pub const MIN_SERVICE_CODE: i64 = 1;

/// Largest accepted service code (`cServ`).
pub const MAX_SERVICE_CODE: i64 = 99;

/// Emission dates are plain calendar dates.
pub const EMISSION_DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Loose numbers
// ---------------------------------------------------------------------------

/// A value that providers send either as a JSON number or as a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(serde_json::Number),
    Text(String),
}

impl LooseNumber {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for LooseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload structures
// ---------------------------------------------------------------------------

/// Request body of `POST /emissao`.
///
/// Entries are kept as raw JSON so each manifest can be decoded, validated and
/// audited independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotfisBatch {
    #[serde(default)]
    pub documentos: Vec<serde_json::Value>,
}

/// One freight manifest: header, actors and line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Manifest {
    #[validate(nested)]
    pub minuta: MinutaHeader,
    #[validate(nested)]
    pub rem: Actor,
    #[validate(nested)]
    pub dest: Actor,
    #[serde(default)]
    #[validate(nested)]
    pub toma: Option<Actor>,
    #[serde(default)]
    #[validate(nested)]
    pub receb: Option<Actor>,
    #[serde(default)]
    #[validate(length(min = 1, message = "manifest has no invoices"))]
    pub documentos: Vec<NotaFiscalItem>,
}

/// Manifest header (`minuta`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MinutaHeader {
    #[validate(required, custom(function = "not_blank"))]
    pub toma: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub n_doc_emit: Option<String>,
    #[validate(required, custom(function = "validate_emission_date"))]
    pub d_emi: Option<String>,
    #[validate(required, custom(function = "validate_service_code"))]
    pub c_serv: Option<LooseNumber>,
    #[validate(required, custom(function = "not_blank"))]
    pub c_tab: Option<String>,
    #[validate(required)]
    pub tp_emi: Option<i32>,
    #[validate(required)]
    pub c_status: Option<i32>,
    #[validate(required, custom(function = "not_blank"))]
    pub c_aut: Option<String>,
    #[validate(nested)]
    pub carga: Carga,
    pub c_orig_calc: Option<String>,
    pub c_dest_calc: Option<String>,
}

impl MinutaHeader {
    /// Origin calculation code, taken from the header or, as some providers
    /// send it, from the cargo block.
    pub fn origin_code(&self) -> Option<&str> {
        self.c_orig_calc
            .as_deref()
            .or(self.carga.c_orig_calc.as_deref())
    }

    /// Destination calculation code, header first then cargo block.
    pub fn destination_code(&self) -> Option<&str> {
        self.c_dest_calc
            .as_deref()
            .or(self.carga.c_dest_calc.as_deref())
    }
}

/// Cargo totals. Numeric values travel as strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Carga {
    #[validate(required, custom(function = "not_blank"))]
    pub p_bru: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub p_cub: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub q_vol: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub v_tot: Option<String>,
    pub c_orig_calc: Option<String>,
    pub c_dest_calc: Option<String>,
}

/// A party on the manifest (sender, receiver, payer or delivery receiver).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[validate(required, custom(function = "validate_document_number"))]
    pub n_doc: Option<String>,
    #[serde(rename = "IE")]
    #[validate(required, custom(function = "not_blank"))]
    pub ie: Option<String>,
    #[validate(required)]
    pub c_fiscal: Option<i32>,
    #[validate(required, custom(function = "not_blank"))]
    pub x_nome: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub x_fant: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub x_lgr: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub nro: Option<String>,
    pub x_cpl: Option<String>,
    #[validate(required, custom(function = "not_blank"))]
    pub x_bairro: Option<String>,
    #[validate(required, custom(function = "validate_municipality_code"))]
    pub c_mun: Option<String>,
    #[serde(rename = "CEP")]
    #[validate(required, custom(function = "not_blank"))]
    pub cep: Option<String>,
    #[validate(required)]
    pub c_pais: Option<i32>,
    pub n_fone: Option<String>,
    #[validate(email(message = "invalid e-mail address"))]
    pub email: Option<String>,
}

/// One fiscal document (invoice) inside a manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotaFiscalItem {
    pub n_ped: Option<String>,
    pub serie: Option<String>,
    #[validate(
        required(message = "invoice number (nDoc) is required"),
        custom(function = "not_blank")
    )]
    pub n_doc: Option<String>,
    pub d_emi: Option<String>,
    #[serde(rename = "vBC")]
    pub v_bc: Option<String>,
    #[serde(rename = "vICMS")]
    pub v_icms: Option<String>,
    #[serde(rename = "vBCST")]
    pub v_bcst: Option<String>,
    #[serde(rename = "vST")]
    pub v_st: Option<String>,
    pub v_prod: Option<String>,
    #[serde(rename = "vNF")]
    #[validate(custom(function = "validate_invoice_value"))]
    pub v_nf: Option<LooseNumber>,
    #[serde(rename = "nCFOP")]
    pub n_cfop: Option<String>,
    pub p_bru: Option<String>,
    pub q_vol: Option<String>,
    #[validate(
        required(message = "access key (chave) is required"),
        length(equal = 44, message = "access key (chave) must have 44 characters")
    )]
    pub chave: Option<String>,
    pub tp_doc: Option<String>,
    pub x_esp: Option<String>,
    pub x_nat: Option<String>,
    pub xmls_b64: Option<Vec<String>>,
    pub cte: Option<CteReference>,
    /// Sender of this particular invoice, when it differs from the manifest sender.
    pub rem: Option<ActorReference>,
}

/// Transport document (CT-e) attached to an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CteReference {
    #[serde(rename = "Chave", alias = "chave")]
    pub chave: Option<String>,
}

/// Minimal actor identity nested inside an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorReference {
    pub n_doc: Option<String>,
    pub x_nome: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Why a manifest entry could not be accepted.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{}", describe_validation_errors(.0))]
    Invalid(#[from] ValidationErrors),
}

/// Decode one raw batch entry and run the manifest-level rules.
pub fn parse_manifest(raw: &serde_json::Value) -> Result<Manifest, ManifestError> {
    let manifest: Manifest = serde_json::from_value(raw.clone())?;
    manifest.validate()?;
    Ok(manifest)
}

/// Flatten nested `validator` errors into `path: message` pairs joined by `; `.
///
/// Output is sorted so messages are stable across runs.
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    collect_errors("", errors, &mut lines);
    lines.sort();
    lines.join("; ")
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    collect_errors(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Field rules
// ---------------------------------------------------------------------------

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("blank", "must not be empty"));
    }
    Ok(())
}

fn validate_service_code(value: &LooseNumber) -> Result<(), ValidationError> {
    let code = value
        .as_i64()
        .ok_or_else(|| rule("service_code", "cServ must be numeric"))?;
    if !(MIN_SERVICE_CODE..=MAX_SERVICE_CODE).contains(&code) {
        return Err(rule("service_code_range", "cServ must be between 1 and 99"));
    }
    Ok(())
}

fn validate_emission_date(value: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(value, EMISSION_DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| rule("date", "dEmi must be formatted as YYYY-MM-DD"))
}

fn validate_document_number(value: &str) -> Result<(), ValidationError> {
    match value.chars().count() {
        11 | 14 => Ok(()),
        _ => Err(rule("document", "nDoc must be a CPF (11) or CNPJ (14)")),
    }
}

fn validate_municipality_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == MUNICIPALITY_CODE_DIGITS && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(rule("municipality", "cMun must have 7 digits"))
    }
}

fn validate_invoice_value(value: &LooseNumber) -> Result<(), ValidationError> {
    match value.as_f64() {
        Some(v) if v > 0.0 => Ok(()),
        Some(_) => Err(rule("invoice_value", "vNF must be greater than zero")),
        None => Err(rule("invoice_value", "vNF must be numeric")),
    }
}

/// Service code as an integer when it parses and is in range.
pub fn service_code(header: &MinutaHeader) -> Option<i64> {
    header
        .c_serv
        .as_ref()
        .and_then(LooseNumber::as_i64)
        .filter(|code| (MIN_SERVICE_CODE..=MAX_SERVICE_CODE).contains(code))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
