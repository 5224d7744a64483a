use chrono::NaiveDate;
use shared_types::CancellationKind;
use std::collections::HashSet;

use crate::normalize::normalize_invoice_number;
use crate::pergamo::CancellationRow;

#[derive(Debug, Clone)]
pub struct ClassifiedCancellation {
    /// Normalized invoice number the classification was made on
    pub invoice_key: String,
    pub kind: CancellationKind,
    pub row: CancellationRow,
}

#[derive(Debug, Default)]
pub struct CancellationBatch {
    pub records: Vec<ClassifiedCancellation>,
    pub discarded_before_cutoff: usize,
    pub without_number: usize,
}

impl CancellationBatch {
    pub fn count(&self, kind: CancellationKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}

fn keys_of(rows: &[CancellationRow]) -> HashSet<String> {
    rows.iter()
        .map(|r| normalize_invoice_number(&r.factura))
        .filter(|k| !k.is_empty())
        .collect()
}

/// Classifies the anulaciones report.
///
/// General-set rows dated before `cutoff` are discarded first. An invoice
/// number then present in both sets is an Anulación; present in only one
/// set it is a Nota Crédito.
pub fn classify_cancellations(
    detailed: Vec<CancellationRow>,
    mut general: Vec<CancellationRow>,
    cutoff: NaiveDate,
) -> CancellationBatch {
    let mut batch = CancellationBatch::default();

    general.retain(|row| {
        let before_cutoff = !normalize_invoice_number(&row.factura).is_empty()
            && row.date().is_some_and(|date| date < cutoff);
        if before_cutoff {
            batch.discarded_before_cutoff += 1;
        }
        !before_cutoff
    });

    let detailed_keys = keys_of(&detailed);
    let general_keys = keys_of(&general);

    for row in detailed {
        let invoice_key = normalize_invoice_number(&row.factura);
        if invoice_key.is_empty() {
            batch.without_number += 1;
            continue;
        }
        let kind = if general_keys.contains(&invoice_key) {
            CancellationKind::Anulacion
        } else {
            CancellationKind::NotaCredito
        };
        batch.records.push(ClassifiedCancellation {
            invoice_key,
            kind,
            row,
        });
    }

    for row in general {
        let invoice_key = normalize_invoice_number(&row.factura);
        if invoice_key.is_empty() {
            batch.without_number += 1;
            continue;
        }
        if detailed_keys.contains(&invoice_key) {
            continue;
        }
        batch.records.push(ClassifiedCancellation {
            invoice_key,
            kind: CancellationKind::NotaCredito,
            row,
        });
    }

    batch
}
