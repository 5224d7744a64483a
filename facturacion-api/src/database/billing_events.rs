use crate::database::{now_timestamp, AsyncDbConnection, Page, INSERT_BATCH_SIZE};
use anyhow::Result;
use billing_rules::normalize_invoice_number;
use rusqlite::types::Value;
use rusqlite::OptionalExtension;
use shared_types::{BillingEvent, BillingSummary, FacilityTotal, Period, PeriodTotal};
use std::collections::HashSet;

/// Invoice ready to be stored; dates are ISO strings
#[derive(Debug, Clone)]
pub struct NewBillingEvent {
    pub numero_factura: String,
    pub fecha_facturacion: String,
    pub valor: f64,
    pub sede_id: i64,
    pub aseguradora: Option<String>,
    pub documento_paciente: Option<String>,
    pub nombre_paciente: Option<String>,
    pub periodo: Period,
    pub fecha_inicio_servicio: Option<String>,
    pub fecha_fin_servicio: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BillingEventFilter {
    pub fecha_inicial: Option<String>,
    pub fecha_final: Option<String>,
    /// Matches invoice number, patient document or patient name
    pub search: Option<String>,
    pub sede_id: Option<i64>,
    pub aseguradora: Option<String>,
    pub periodo: Option<Period>,
}

impl BillingEventFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(fecha) = &self.fecha_inicial {
            conditions.push("e.fecha_facturacion >= ?");
            params.push(Value::Text(fecha.clone()));
        }
        if let Some(fecha) = &self.fecha_final {
            conditions.push("e.fecha_facturacion <= ?");
            params.push(Value::Text(fecha.clone()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(
                "(e.numero_factura LIKE ? OR e.documento_paciente LIKE ? OR e.nombre_paciente LIKE ?)",
            );
            let pattern = format!("%{}%", search);
            for _ in 0..3 {
                params.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(sede_id) = self.sede_id {
            conditions.push("e.sede_id = ?");
            params.push(Value::Integer(sede_id));
        }
        if let Some(aseguradora) = self
            .aseguradora
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            conditions.push("e.aseguradora LIKE ?");
            params.push(Value::Text(format!("%{}%", aseguradora)));
        }
        if let Some(periodo) = self.periodo {
            conditions.push("e.periodo = ?");
            params.push(Value::Text(periodo.as_str().to_string()));
        }

        let clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        (clause, params)
    }
}

const SELECT_EVENT: &str = "SELECT e.id, e.numero_factura, e.fecha_facturacion, e.valor, e.sede_id, s.nombre,
        e.aseguradora, e.documento_paciente, e.nombre_paciente, e.periodo,
        e.fecha_inicio_servicio, e.fecha_fin_servicio, e.created_at, e.updated_at
     FROM facturacion_evento e
     LEFT JOIN sede s ON s.id = e.sede_id";

fn map_event(row: &rusqlite::Row) -> rusqlite::Result<BillingEvent> {
    let periodo: Option<String> = row.get(9)?;
    Ok(BillingEvent {
        id: row.get(0)?,
        numero_factura: row.get(1)?,
        fecha_facturacion: row.get(2)?,
        valor: row.get(3)?,
        sede_id: row.get(4)?,
        sede_nombre: row.get(5)?,
        aseguradora: row.get(6)?,
        documento_paciente: row.get(7)?,
        nombre_paciente: row.get(8)?,
        periodo: periodo.as_deref().and_then(Period::parse),
        fecha_inicio_servicio: row.get(10)?,
        fecha_fin_servicio: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Normalized numbers of every stored invoice
pub async fn load_invoice_keys(conn: AsyncDbConnection) -> Result<HashSet<String>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare("SELECT numero_normalizado FROM facturacion_evento")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}

/// Inserts in transactions of `INSERT_BATCH_SIZE` rows, returning the rows written
pub async fn insert_billing_events(
    conn: AsyncDbConnection,
    events: &[NewBillingEvent],
) -> Result<usize> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut inserted = 0;

    for chunk in events.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO facturacion_evento
                 (numero_factura, numero_normalizado, fecha_facturacion, valor, sede_id,
                  aseguradora, documento_paciente, nombre_paciente, periodo,
                  fecha_inicio_servicio, fecha_fin_servicio, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for event in chunk {
                inserted += stmt.execute(rusqlite::params![
                    event.numero_factura.trim(),
                    normalize_invoice_number(&event.numero_factura),
                    &event.fecha_facturacion,
                    event.valor,
                    event.sede_id,
                    event.aseguradora,
                    event.documento_paciente,
                    event.nombre_paciente,
                    event.periodo.as_str(),
                    event.fecha_inicio_servicio,
                    event.fecha_fin_servicio,
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
pub async fn list_billing_events(
    conn: AsyncDbConnection,
    filter: &BillingEventFilter,
    page: Option<Page>,
) -> Result<(Vec<BillingEvent>, i64)> {
    let conn = conn.lock().await?;
    let (clause, mut params) = filter.where_clause();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM facturacion_evento e {}", clause),
        rusqlite::params_from_iter(params.iter()),
        |row| row.get(0),
    )?;

    let mut sql = format!(
        "{} {} ORDER BY e.fecha_facturacion DESC, e.id DESC",
        SELECT_EVENT, clause
    );
    if let Some(page) = page {
        sql.push_str(" LIMIT ? OFFSET ?");
        params.push(Value::Integer(page.limit));
        params.push(Value::Integer(page.offset()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), map_event)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((events, total))
}

pub async fn get_billing_event(conn: AsyncDbConnection, id: i64) -> Result<Option<BillingEvent>> {
    let conn = conn.lock().await?;
    let event = conn
        .query_row(&format!("{} WHERE e.id = ?", SELECT_EVENT), [id], map_event)
        .optional()?;
    Ok(event)
}

/// Manual period override; `None` when the event does not exist
pub async fn update_period(
    conn: AsyncDbConnection,
    id: i64,
    periodo: Option<Period>,
) -> Result<Option<BillingEvent>> {
    let updated = {
        let conn = conn.lock().await?;
        conn.execute(
            "UPDATE facturacion_evento SET periodo = ?, updated_at = ? WHERE id = ?",
            rusqlite::params![periodo.map(|p| p.as_str()), now_timestamp(), id],
        )?
    };
    if updated == 0 {
        return Ok(None);
    }
    get_billing_event(conn, id).await
}

/// Sets valor to zero and periodo to ANULADA on every event whose normalized
/// number is in `keys`, returning how many events changed.
pub async fn void_invoices(conn: AsyncDbConnection, keys: &[String]) -> Result<usize> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut voided = 0;

    for chunk in keys.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE facturacion_evento
                 SET valor = 0, periodo = 'ANULADA', updated_at = ?
                 WHERE numero_normalizado = ?
                   AND (periodo IS NULL OR periodo != 'ANULADA' OR valor != 0)",
            )?;
            for key in chunk {
                voided += stmt.execute(rusqlite::params![now, key])?;
            }
        }
        tx.commit()?;
    }

    Ok(voided)
}

/// Event still missing its period or its service dates
#[derive(Debug, Clone)]
pub struct BackfillCandidate {
    pub id: i64,
    pub numero_normalizado: String,
    pub fecha_facturacion: String,
    pub periodo: Option<Period>,
    pub fecha_inicio_servicio: Option<String>,
    pub fecha_fin_servicio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodUpdate {
    pub id: i64,
    pub periodo: Period,
    pub fecha_inicio_servicio: Option<String>,
    pub fecha_fin_servicio: Option<String>,
}

/// Voided events are never candidates
pub async fn list_backfill_candidates(conn: AsyncDbConnection) -> Result<Vec<BackfillCandidate>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(
        "SELECT id, numero_normalizado, fecha_facturacion, periodo,
                fecha_inicio_servicio, fecha_fin_servicio
         FROM facturacion_evento
         WHERE periodo IS NULL
            OR (periodo != 'ANULADA'
                AND (fecha_inicio_servicio IS NULL OR fecha_fin_servicio IS NULL))
         ORDER BY id",
    )?;
    let candidates = stmt
        .query_map([], |row| {
            let periodo: Option<String> = row.get(3)?;
            Ok(BackfillCandidate {
                id: row.get(0)?,
                numero_normalizado: row.get(1)?,
                fecha_facturacion: row.get(2)?,
                periodo: periodo.as_deref().and_then(Period::parse),
                fecha_inicio_servicio: row.get(4)?,
                fecha_fin_servicio: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(candidates)
}

pub async fn apply_period_updates(
    conn: AsyncDbConnection,
    updates: &[PeriodUpdate],
) -> Result<usize> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut applied = 0;

    for chunk in updates.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE facturacion_evento
                 SET periodo = ?, fecha_inicio_servicio = ?, fecha_fin_servicio = ?, updated_at = ?
                 WHERE id = ?",
            )?;
            for update in chunk {
                applied += stmt.execute(rusqlite::params![
                    update.periodo.as_str(),
                    update.fecha_inicio_servicio,
                    update.fecha_fin_servicio,
                    now,
                    update.id
                ])?;
            }
        }
        tx.commit()?;
    }

    Ok(applied)
}

/// Totals by period and by facility for events billed within the range
pub async fn summarize(
    conn: AsyncDbConnection,
    fecha_inicial: &str,
    fecha_final: &str,
) -> Result<BillingSummary> {
    let conn = conn.lock().await?;
    let range = [fecha_inicial, fecha_final];

    let (total_count, total_valor): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(valor), 0)
         FROM facturacion_evento
         WHERE fecha_facturacion >= ? AND fecha_facturacion <= ?",
        range,
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT periodo, COUNT(*), COALESCE(SUM(valor), 0)
         FROM facturacion_evento
         WHERE fecha_facturacion >= ? AND fecha_facturacion <= ?
         GROUP BY periodo
         ORDER BY periodo",
    )?;
    let por_periodo = stmt
        .query_map(range, |row| {
            let periodo: Option<String> = row.get(0)?;
            Ok(PeriodTotal {
                periodo: periodo.as_deref().and_then(Period::parse),
                count: row.get(1)?,
                valor: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT e.sede_id, COALESCE(s.nombre, ''), COUNT(*), COALESCE(SUM(e.valor), 0)
         FROM facturacion_evento e
         LEFT JOIN sede s ON s.id = e.sede_id
         WHERE e.fecha_facturacion >= ? AND e.fecha_facturacion <= ?
         GROUP BY e.sede_id, s.nombre
         ORDER BY s.nombre",
    )?;
    let por_sede = stmt
        .query_map(range, |row| {
            Ok(FacilityTotal {
                sede_id: row.get(0)?,
                sede_nombre: row.get(1)?,
                count: row.get(2)?,
                valor: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BillingSummary {
        fecha_inicial: fecha_inicial.to_string(),
        fecha_final: fecha_final.to_string(),
        total_count,
        total_valor,
        por_periodo,
        por_sede,
    })
}
