use crate::database::{now_timestamp, AsyncDbConnection, Page, INSERT_BATCH_SIZE};
use anyhow::Result;
use billing_rules::{normalize_invoice_number, ReplacementUpdate};
use rusqlite::types::Value;
use shared_types::{Cancellation, CancellationKind};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct NewCancellation {
    pub numero_anulacion: String,
    pub numero_factura: String,
    pub tipo_registro: CancellationKind,
    pub fecha: String,
    pub valor: f64,
    pub sede_id: i64,
    pub aseguradora: Option<String>,
    pub motivo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CancellationFilter {
    pub fecha_inicial: Option<String>,
    pub fecha_final: Option<String>,
    /// Matches cancellation or invoice number
    pub search: Option<String>,
    pub sede_id: Option<i64>,
    pub aseguradora: Option<String>,
    pub tipo_registro: Option<CancellationKind>,
}

impl CancellationFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(fecha) = &self.fecha_inicial {
            conditions.push("a.fecha >= ?");
            params.push(Value::Text(fecha.clone()));
        }
        if let Some(fecha) = &self.fecha_final {
            conditions.push("a.fecha <= ?");
            params.push(Value::Text(fecha.clone()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push("(a.numero_anulacion LIKE ? OR a.numero_factura LIKE ?)");
            let pattern = format!("%{}%", search);
            params.push(Value::Text(pattern.clone()));
            params.push(Value::Text(pattern));
        }
        if let Some(sede_id) = self.sede_id {
            conditions.push("a.sede_id = ?");
            params.push(Value::Integer(sede_id));
        }
        if let Some(aseguradora) = self
            .aseguradora
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            conditions.push("a.aseguradora LIKE ?");
            params.push(Value::Text(format!("%{}%", aseguradora)));
        }
        if let Some(kind) = self.tipo_registro {
            conditions.push("a.tipo_registro = ?");
            params.push(Value::Text(kind.as_str().to_string()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }
}

const SELECT_CANCELLATION: &str = "SELECT a.id, a.numero_anulacion, a.numero_factura, a.tipo_registro,
        a.fecha, a.valor, a.sede_id, s.nombre, a.aseguradora, a.motivo,
        a.facturas_reemplazo, a.fechas_reemplazo, a.valores_reemplazo, a.created_at, a.updated_at
     FROM anulacion a
     LEFT JOIN sede s ON s.id = a.sede_id";

fn map_cancellation(row: &rusqlite::Row) -> rusqlite::Result<Cancellation> {
    let tipo: String = row.get(3)?;
    Ok(Cancellation {
        id: row.get(0)?,
        numero_anulacion: row.get(1)?,
        numero_factura: row.get(2)?,
        tipo_registro: CancellationKind::parse(&tipo).unwrap_or(CancellationKind::NotaCredito),
        fecha: row.get(4)?,
        valor: row.get(5)?,
        sede_id: row.get(6)?,
        sede_nombre: row.get(7)?,
        aseguradora: row.get(8)?,
        motivo: row.get(9)?,
        facturas_reemplazo: row.get(10)?,
        fechas_reemplazo: row.get(11)?,
        valores_reemplazo: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Normalized cancellation numbers already stored
pub async fn load_cancellation_keys(conn: AsyncDbConnection) -> Result<HashSet<String>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare("SELECT numero_normalizado FROM anulacion")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}

/// Normalized invoice numbers voided by a stored Anulación
pub async fn load_voided_invoice_keys(conn: AsyncDbConnection) -> Result<HashSet<String>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(
        "SELECT DISTINCT factura_normalizada FROM anulacion
         WHERE tipo_registro = ? AND factura_normalizada != ''",
    )?;
    let keys = stmt
        .query_map([CancellationKind::Anulacion.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}

/// Inserts in transactions of `INSERT_BATCH_SIZE` rows, returning the rows written
pub async fn insert_cancellations(
    conn: AsyncDbConnection,
    records: &[NewCancellation],
) -> Result<usize> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut inserted = 0;

    for chunk in records.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO anulacion
                 (numero_anulacion, numero_normalizado, numero_factura, factura_normalizada,
                  tipo_registro, fecha, valor, sede_id, aseguradora, motivo, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for record in chunk {
                inserted += stmt.execute(rusqlite::params![
                    record.numero_anulacion.trim(),
                    normalize_invoice_number(&record.numero_anulacion),
                    record.numero_factura.trim(),
                    normalize_invoice_number(&record.numero_factura),
                    record.tipo_registro.as_str(),
                    &record.fecha,
                    record.valor,
                    record.sede_id,
                    record.aseguradora,
                    record.motivo,
                    now,
                    now
                ])?;
            }
        }
        tx.commit()?;
    }

    Ok(inserted)
}

/// Returns the requested page (all rows when `page` is `None`) and the total match count
pub async fn list_cancellations(
    conn: AsyncDbConnection,
    filter: &CancellationFilter,
    page: Option<Page>,
) -> Result<(Vec<Cancellation>, i64)> {
    let conn = conn.lock().await?;
    let (clause, mut params) = filter.where_clause();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM anulacion a {}", clause),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let mut sql = format!("{} {} ORDER BY a.fecha DESC, a.id DESC", SELECT_CANCELLATION, clause);
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(page.limit));
        params.push(Value::Integer(page.offset()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), map_cancellation)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((records, total))
}

/// Writes replacement invoices onto matching cancellations.
///
/// Returns the number of cancellations updated and the uploaded numbers
/// that matched nothing, as written in the upload.
pub async fn apply_replacements(
    conn: AsyncDbConnection,
    updates: &[ReplacementUpdate],
) -> Result<(usize, Vec<String>)> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut updated = 0;
    let mut not_found = Vec::new();

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "UPDATE anulacion
             SET facturas_reemplazo = ?, fechas_reemplazo = ?, valores_reemplazo = ?, updated_at = ?
             WHERE numero_normalizado = ?",
        )?;
        for update in updates {
            let changed = stmt.execute(rusqlite::params![
                update.facturas,
                update.fechas,
                update.valores,
                now,
                &update.key
            ])?;
            if changed == 0 {
                not_found.push(update.numero_anulacion.clone());
            } else {
                updated += changed;
            }
        }
    }
    tx.commit()?;

    Ok((updated, not_found))
}
