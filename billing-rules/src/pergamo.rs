//! Rows as they appear inside Pergamo report payloads.
//!
//! Pergamo is inconsistent about JSON types: numbers arrive as strings,
//! identifiers as numbers, and empty strings stand in for nulls. Every field
//! is therefore decoded leniently and defaults when absent.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::dates::parse_pergamo_date;
use crate::error::RulesError;

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Parses amounts such as `125000`, `"125000.50"` or `"125,000.50"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .or_else(|| cleaned.replace(',', "").parse::<f64>().ok())
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(&s),
        _ => None,
    };
    Ok(amount.unwrap_or(0.0))
}

/// Invoice row of the facturación report (`data.h3`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceRow {
    #[serde(rename = "Factura", default, deserialize_with = "lenient_string")]
    pub factura: String,
    #[serde(
        rename = "Fecha_Facturacion",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub fecha_facturacion: Option<String>,
    #[serde(rename = "Total_Facturado", default, deserialize_with = "lenient_amount")]
    pub total_facturado: f64,
    #[serde(rename = "Sede", default, deserialize_with = "lenient_opt_string")]
    pub sede: Option<String>,
    #[serde(rename = "Aseguradora", default, deserialize_with = "lenient_opt_string")]
    pub aseguradora: Option<String>,
    #[serde(
        rename = "Documento_Paciente",
        alias = "Documento",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub documento_paciente: Option<String>,
    #[serde(
        rename = "Nombre_Paciente",
        alias = "Paciente",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub nombre_paciente: Option<String>,
}

impl InvoiceRow {
    pub fn billing_date(&self) -> Option<NaiveDate> {
        self.fecha_facturacion.as_deref().and_then(parse_pergamo_date)
    }
}

/// Service line of the RIPS report (`data.report_rips`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RipsRow {
    #[serde(rename = "Factura", default, deserialize_with = "lenient_string")]
    pub factura: String,
    #[serde(
        rename = "Cups",
        alias = "Codigo_Cups",
        default,
        deserialize_with = "lenient_string"
    )]
    pub cups: String,
    #[serde(
        rename = "Documento_Paciente",
        alias = "Documento",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub documento_paciente: Option<String>,
    #[serde(
        rename = "Fecha_Inicio",
        alias = "Fecha_Inicio_Atencion",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub fecha_inicio: Option<String>,
    #[serde(
        rename = "Fecha_Fin",
        alias = "Fecha_Fin_Atencion",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub fecha_fin: Option<String>,
    #[serde(rename = "Valor", default, deserialize_with = "lenient_amount")]
    pub valor: f64,
    #[serde(rename = "Sede", default, deserialize_with = "lenient_opt_string")]
    pub sede: Option<String>,
}

impl RipsRow {
    pub fn service_start(&self) -> Option<NaiveDate> {
        self.fecha_inicio.as_deref().and_then(parse_pergamo_date)
    }

    pub fn service_end(&self) -> Option<NaiveDate> {
        self.fecha_fin.as_deref().and_then(parse_pergamo_date)
    }
}

/// Row of the anulaciones report, both detailed (`h3`) and general (`h2`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancellationRow {
    #[serde(rename = "Factura", default, deserialize_with = "lenient_string")]
    pub factura: String,
    #[serde(
        rename = "Numero_Anulacion",
        alias = "Nota",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub numero_anulacion: Option<String>,
    #[serde(
        rename = "Fecha_Facturacion",
        alias = "Fecha",
        default,
        deserialize_with = "lenient_opt_string"
    )]
    pub fecha: Option<String>,
    #[serde(rename = "Total_Facturado", alias = "Valor", default, deserialize_with = "lenient_amount")]
    pub valor: f64,
    #[serde(rename = "Sede", default, deserialize_with = "lenient_opt_string")]
    pub sede: Option<String>,
    #[serde(rename = "Aseguradora", default, deserialize_with = "lenient_opt_string")]
    pub aseguradora: Option<String>,
    #[serde(rename = "Motivo", default, deserialize_with = "lenient_opt_string")]
    pub motivo: Option<String>,
}

impl CancellationRow {
    pub fn date(&self) -> Option<NaiveDate> {
        self.fecha.as_deref().and_then(parse_pergamo_date)
    }

    /// Cancellation document number, falling back to the invoice number
    pub fn document_number(&self) -> &str {
        self.numero_anulacion.as_deref().unwrap_or(&self.factura)
    }
}

/// Decodes every row it can; returns the rows plus the errors for the rest.
pub fn decode_rows<T>(values: Vec<Value>) -> (Vec<T>, Vec<RulesError>)
where
    T: for<'de> Deserialize<'de>,
{
    let mut rows = Vec::with_capacity(values.len());
    let mut errors = Vec::new();

    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(row) => rows.push(row),
            Err(e) => errors.push(RulesError::MalformedRow(e.to_string())),
        }
    }

    (rows, errors)
}
