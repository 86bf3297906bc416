//! Brazilian administrative geography (IBGE codes) used to normalize
//! shipment addresses.

use serde::{Deserialize, Serialize};

/// IBGE municipality codes have seven digits.
pub const MUNICIPALITY_CODE_DIGITS: usize = 7;

/// A municipality resolved from its IBGE code, with its state when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub codigo_ibge: i32,
    pub nome: String,
    pub estado_codigo_ibge: Option<i32>,
    pub estado_sigla: Option<String>,
}

/// Which address on a shipment a location belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationRole {
    Sender,
    Receiver,
    DeliveryReceiver,
    Origin,
    Destination,
}

impl LocationRole {
    pub const ALL: [LocationRole; 5] = [
        Self::Sender,
        Self::Receiver,
        Self::DeliveryReceiver,
        Self::Origin,
        Self::Destination,
    ];

    /// Column prefix for this role's normalized location fields.
    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::Sender => "rem",
            Self::Receiver => "dest",
            Self::DeliveryReceiver => "recebedor",
            Self::Origin => "origem",
            Self::Destination => "destino",
        }
    }
}

impl std::fmt::Display for LocationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_prefix())
    }
}

/// Parse an IBGE code that may arrive as a padded string.
///
/// Returns `None` for blanks, non-numeric input and zero.
pub fn parse_ibge_code(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok().filter(|code| *code > 0)
}

/// Normalize a state abbreviation (`sp` -> `SP`). Rejects anything that is
/// not two ASCII letters.
pub fn normalize_uf(raw: &str) -> Option<String> {
    let uf = raw.trim();
    if uf.len() == 2 && uf.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(uf.to_ascii_uppercase())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ibge_code_trims_and_rejects_garbage() {
        assert_eq!(parse_ibge_code(" 3550308 "), Some(3550308));
        assert_eq!(parse_ibge_code(""), None);
        assert_eq!(parse_ibge_code("0"), None);
        assert_eq!(parse_ibge_code("35A0308"), None);
    }

    #[test]
    fn normalize_uf_uppercases() {
        assert_eq!(normalize_uf("sp"), Some("SP".to_string()));
        assert_eq!(normalize_uf(" Mg "), Some("MG".to_string()));
        assert_eq!(normalize_uf("SPX"), None);
        assert_eq!(normalize_uf("1A"), None);
    }

    #[test]
    fn column_prefixes_are_distinct() {
        let mut prefixes: Vec<_> = LocationRole::ALL.iter().map(|r| r.column_prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), LocationRole::ALL.len());
    }
}
