use shared_types::ReplacementRow;
use std::collections::HashMap;

use crate::normalize::normalize_invoice_number;

/// Replacement fields to write onto one cancellation
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementUpdate {
    /// Normalized cancellation number
    pub key: String,
    /// Number as written in the first uploaded row
    pub numero_anulacion: String,
    pub facturas: Option<String>,
    pub fechas: Option<String>,
    pub valores: Option<String>,
}

#[derive(Debug)]
struct Group {
    key: String,
    numero_anulacion: String,
    facturas: Vec<String>,
    fechas: Vec<String>,
    valores: Vec<String>,
}

fn field(value: Option<&String>) -> &str {
    value.map(|v| v.trim()).unwrap_or("")
}

/// Lists where every entry is blank are stored as absent
fn joined(values: Vec<String>) -> Option<String> {
    if values.iter().all(|v| v.is_empty()) {
        None
    } else {
        Some(values.join(","))
    }
}

/// Groups flat-file rows by normalized cancellation number.
///
/// Each field becomes a comma-separated list in upload order; groups keep
/// the order in which their number first appeared. The three lists are read
/// by position, so a blank field keeps an empty slot.
pub fn merge_replacement_rows(rows: &[ReplacementRow]) -> Vec<ReplacementUpdate> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = normalize_invoice_number(&row.numero_anulacion);
        if key.is_empty() {
            continue;
        }

        let factura = field(row.factura_reemplazo.as_ref());
        let fecha = field(row.fecha_reemplazo.as_ref());
        let valor = field(row.valor_reemplazo.as_ref());

        let position = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(Group {
                key,
                numero_anulacion: row.numero_anulacion.trim().to_string(),
                facturas: Vec::new(),
                fechas: Vec::new(),
                valores: Vec::new(),
            });
            groups.len() - 1
        });

        if factura.is_empty() && fecha.is_empty() && valor.is_empty() {
            continue;
        }
        let group = &mut groups[position];
        group.facturas.push(factura.to_string());
        group.fechas.push(fecha.to_string());
        group.valores.push(valor.to_string());
    }

    groups
        .into_iter()
        .map(|group| ReplacementUpdate {
            key: group.key,
            numero_anulacion: group.numero_anulacion,
            facturas: joined(group.facturas),
            fechas: joined(group.fechas),
            valores: joined(group.valores),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(numero: &str, factura: &str, fecha: &str, valor: &str) -> ReplacementRow {
        let opt = |s: &str| if s.is_empty() { None } else { Some(s.to_string()) };
        ReplacementRow {
            numero_anulacion: numero.to_string(),
            factura_reemplazo: opt(factura),
            fecha_reemplazo: opt(fecha),
            valor_reemplazo: opt(valor),
        }
    }

    #[test]
    fn test_rows_for_same_cancellation_are_joined() {
        let updates = merge_replacement_rows(&[
            row("AN-1", "FE-10", "2025-02-01", "1000"),
            row("AN 1", "FE-11", "2025-02-02", "2000"),
            row("AN-2", "FE-20", "", "500"),
        ]);

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].key, "AN1");
        assert_eq!(updates[0].numero_anulacion, "AN-1");
        assert_eq!(updates[0].facturas.as_deref(), Some("FE-10,FE-11"));
        assert_eq!(updates[0].fechas.as_deref(), Some("2025-02-01,2025-02-02"));
        assert_eq!(updates[0].valores.as_deref(), Some("1000,2000"));

        assert_eq!(updates[1].facturas.as_deref(), Some("FE-20"));
        assert!(updates[1].fechas.is_none());
    }

    #[test]
    fn test_blank_fields_keep_lists_aligned() {
        let updates = merge_replacement_rows(&[
            row("AN-1", "FE-10", "", "1000"),
            row("AN-1", "FE-11", "2025-02-02", "2000"),
            row("AN-1", "", "", ""),
        ]);

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].facturas.as_deref(), Some("FE-10,FE-11"));
        assert_eq!(updates[0].fechas.as_deref(), Some(",2025-02-02"));
        assert_eq!(updates[0].valores.as_deref(), Some("1000,2000"));
    }

    #[test]
    fn test_rows_without_number_are_skipped() {
        let updates = merge_replacement_rows(&[row(" - ", "FE-1", "", "")]);
        assert!(updates.is_empty());
    }
}
