use crate::database::{now_timestamp, AsyncDbConnection, INSERT_BATCH_SIZE};
use anyhow::Result;
use billing_rules::{normalize_invoice_number, parse_pergamo_date, ServiceIndex, ServiceWindow};
use shared_types::{RipsRecord, RipsReport};
use std::collections::HashSet;

/// RIPS line ready to be stored; dates are ISO strings
#[derive(Debug, Clone)]
pub struct NewRipsRecord {
    pub numero_factura: String,
    pub codigo_cups: String,
    pub documento_paciente: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub valor: f64,
    pub sede: Option<String>,
}

/// Dedup key of a RIPS line: normalized invoice number and trimmed CUPS code
pub fn rips_key(numero_factura: &str, codigo_cups: &str) -> (String, String) {
    (
        normalize_invoice_number(numero_factura),
        codigo_cups.trim().to_string(),
    )
}

pub async fn load_rips_keys(conn: AsyncDbConnection) -> Result<HashSet<(String, String)>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare("SELECT factura_normalizada, codigo_cups FROM rips_factura")?;
    let keys = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(keys)
}

/// Inserts in transactions of `INSERT_BATCH_SIZE` rows, returning the rows written
pub async fn insert_rips_records(
    conn: AsyncDbConnection,
    records: &[NewRipsRecord],
) -> Result<usize> {
    let mut conn = conn.lock().await?;
    let now = now_timestamp();
    let mut inserted = 0;

    for chunk in records.chunks(INSERT_BATCH_SIZE) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO rips_factura
                 (numero_factura, factura_normalizada, codigo_cups, documento_paciente,
                  fecha_inicio, fecha_fin, valor, sede, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;
            for record in chunk {
                let (factura_normalizada, codigo_cups) =
                    rips_key(&record.numero_factura, &record.codigo_cups);
                inserted += stmt.execute(rusqlite::params![
                    record.numero_factura.trim(),
                    factura_normalizada,
                    codigo_cups,
                    record.documento_paciente,
                    record.fecha_inicio,
                    record.fecha_fin,
                    record.valor,
                    record.sede,
                    now
                ])?;
            }
        }
        tx.commit()?;
    }

    Ok(inserted)
}

/// Service windows of every stored invoice, used by period classification
pub async fn load_service_index(conn: AsyncDbConnection) -> Result<ServiceIndex> {
    let conn = conn.lock().await?;
    let mut stmt =
        conn.prepare("SELECT factura_normalizada, fecha_inicio, fecha_fin FROM rips_factura")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut index = ServiceIndex::new();
    for row in rows {
        let (numero, inicio, fin) = row?;
        let window = ServiceWindow::new(
            inicio.as_deref().and_then(parse_pergamo_date),
            fin.as_deref().and_then(parse_pergamo_date),
        );
        index.insert(&numero, window);
    }
    Ok(index)
}

pub async fn list_rips_for_invoice(
    conn: AsyncDbConnection,
    numero_factura: &str,
) -> Result<Vec<RipsRecord>> {
    let key = normalize_invoice_number(numero_factura);
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(
        "SELECT id, numero_factura, codigo_cups, documento_paciente, fecha_inicio, fecha_fin,
                valor, sede, created_at
         FROM rips_factura
         WHERE factura_normalizada = ?
         ORDER BY fecha_inicio, codigo_cups",
    )?;
    let records = stmt
        .query_map([key], |row| {
            Ok(RipsRecord {
                id: row.get(0)?,
                numero_factura: row.get(1)?,
                codigo_cups: row.get(2)?,
                documento_paciente: row.get(3)?,
                fecha_inicio: row.get(4)?,
                fecha_fin: row.get(5)?,
                valor: row.get(6)?,
                sede: row.get(7)?,
                created_at: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

pub async fn insert_rips_report(
    conn: AsyncDbConnection,
    fecha_inicial: &str,
    fecha_final: &str,
    total_registros: usize,
    insertados: usize,
    duplicados: usize,
    user_id: Option<i64>,
) -> Result<i64> {
    let conn = conn.lock().await?;
    let id = conn.query_row(
        "INSERT INTO reporte_rips
         (fecha_inicial, fecha_final, total_registros, insertados, duplicados, user_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
        rusqlite::params![
            fecha_inicial,
            fecha_final,
            total_registros as i64,
            insertados as i64,
            duplicados as i64,
            user_id,
            now_timestamp()
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub async fn list_rips_reports(conn: AsyncDbConnection, limit: usize) -> Result<Vec<RipsReport>> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(
        "SELECT id, fecha_inicial, fecha_final, total_registros, insertados, duplicados,
                user_id, created_at
         FROM reporte_rips
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
    )?;
    let reports = stmt
        .query_map([limit as i64], |row| {
            Ok(RipsReport {
                id: row.get(0)?,
                fecha_inicial: row.get(1)?,
                fecha_final: row.get(2)?,
                total_registros: row.get(3)?,
                insertados: row.get(4)?,
                duplicados: row.get(5)?,
                user_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_database;
    use chrono::NaiveDate;

    fn record(factura: &str, cups: &str, inicio: &str, fin: &str) -> NewRipsRecord {
        NewRipsRecord {
            numero_factura: factura.to_string(),
            codigo_cups: cups.to_string(),
            documento_paciente: Some("1020".to_string()),
            fecha_inicio: Some(inicio.to_string()),
            fecha_fin: Some(fin.to_string()),
            valor: 1500.0,
            sede: Some("NORTE".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_skips_existing_pairs() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        let first = vec![
            record("FE-1", "890201", "2025-01-02", "2025-01-02"),
            record("FE-1", "903841", "2025-01-03", "2025-01-05"),
        ];
        assert_eq!(insert_rips_records(conn.clone(), &first).await.unwrap(), 2);

        let second = vec![record("FE1", "890201", "2025-01-02", "2025-01-02")];
        assert_eq!(insert_rips_records(conn.clone(), &second).await.unwrap(), 0);

        let keys = load_rips_keys(conn.clone()).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&rips_key("FE-1", " 890201 ")));
        assert!(!keys.contains(&rips_key("fe-1", "890201")));
        assert_eq!(list_rips_for_invoice(conn, "FE 1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_service_index_merges_lines() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        insert_rips_records(
            conn.clone(),
            &[
                record("FE-7", "A", "2025-01-10", "2025-01-12"),
                record("FE-7", "B", "2024-12-28", "2025-02-01"),
            ],
        )
        .await
        .unwrap();

        let index = load_service_index(conn).await.unwrap();
        let window = index.get("FE7").unwrap();
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 12, 28));
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2025, 2, 1));
    }

    #[tokio::test]
    async fn test_reports_newest_first() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();
        insert_rips_report(conn.clone(), "2025-01-01", "2025-01-31", 10, 8, 2, Some(1))
            .await
            .unwrap();
        insert_rips_report(conn.clone(), "2025-02-01", "2025-02-28", 5, 5, 0, None)
            .await
            .unwrap();

        let reports = list_rips_reports(conn, 10).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].fecha_inicial, "2025-02-01");
        assert_eq!(reports[1].duplicados, 2);
    }
}
