//! Shared fixtures for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use freightdoc_core::geography::Municipality;
use freightdoc_pipeline::geography::{GeographyResolver, ResolveError};
use serde_json::{json, Value};

/// A valid 44-character access key, distinct per seed.
pub fn access_key(seed: u32) -> String {
    format!("{seed:0>44}")
}

pub fn actor(n_doc: &str, c_mun: &str) -> Value {
    json!({
        "nDoc": n_doc,
        "IE": "ISENTO",
        "cFiscal": 1,
        "xNome": "EMPRESA EXEMPLO LTDA",
        "xFant": "EXEMPLO",
        "xLgr": "RUA TESTE",
        "nro": "100",
        "xBairro": "CENTRO",
        "cMun": c_mun,
        "CEP": "01001000",
        "cPais": 1058
    })
}

pub fn invoice(n_doc: &str, chave: &str) -> Value {
    json!({
        "nDoc": n_doc,
        "serie": "1",
        "vNF": "1000.00",
        "chave": chave
    })
}

/// A valid manifest with the given invoices.
pub fn manifest_with(invoices: Vec<Value>) -> Value {
    json!({
        "minuta": {
            "toma": "0",
            "nDocEmit": "11111111000111",
            "dEmi": "2026-01-23",
            "cServ": "1",
            "cTab": "TAB01",
            "tpEmi": 1,
            "cStatus": 0,
            "cAut": "AUT123",
            "carga": { "pBru": "10.5", "pCub": "5.0", "qVol": "2", "vTot": "5000.00" },
            "cOrigCalc": "3550308",
            "cDestCalc": "3304557"
        },
        "rem": actor("11111111000111", "3550308"),
        "dest": actor("22222222000122", "3304557"),
        "documentos": invoices
    })
}

/// A valid manifest with `n` valid invoices.
pub fn manifest(n: u32) -> Value {
    manifest_with(
        (1..=n)
            .map(|i| invoice(&i.to_string(), &access_key(i)))
            .collect(),
    )
}

/// Resolver over a fixed table.
#[derive(Default)]
pub struct TableResolver {
    entries: HashMap<String, Municipality>,
}

impl TableResolver {
    pub fn with(mut self, codigo_ibge: i32, nome: &str, uf: &str, estado: i32) -> Self {
        self.entries.insert(
            codigo_ibge.to_string(),
            Municipality {
                codigo_ibge,
                nome: nome.to_string(),
                estado_codigo_ibge: Some(estado),
                estado_sigla: Some(uf.to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl GeographyResolver for TableResolver {
    async fn resolve(&self, code: &str) -> Result<Option<Municipality>, ResolveError> {
        Ok(self.entries.get(code).cloned())
    }
}

/// Resolver whose every call fails.
pub struct FailingResolver;

#[async_trait]
impl GeographyResolver for FailingResolver {
    async fn resolve(&self, _code: &str) -> Result<Option<Municipality>, ResolveError> {
        Err(ResolveError::Unavailable("lookup service down".into()))
    }
}
