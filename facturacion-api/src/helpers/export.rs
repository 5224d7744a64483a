use anyhow::Result;
use billing_rules::InsurerDirectory;
use shared_types::{BillingEvent, Cancellation};

/// Internal insurer name and code for a Pergamo insurer string
fn insurer_columns(directory: &InsurerDirectory, raw: Option<&str>) -> (String, String) {
    let raw = raw.unwrap_or("");
    match directory.resolve(raw) {
        Some(entry) => (entry.nombre.clone(), entry.codigo.clone()),
        None => (raw.to_string(), String::new()),
    }
}

fn amount(value: f64) -> String {
    format!("{:.2}", value)
}

pub fn billing_events_csv(events: &[BillingEvent], insurers: &InsurerDirectory) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Factura",
        "Fecha Facturación",
        "Valor",
        "Sede",
        "Aseguradora",
        "Código Aseguradora",
        "Documento Paciente",
        "Nombre Paciente",
        "Periodo",
        "Inicio Servicio",
        "Fin Servicio",
    ])?;

    for event in events {
        let (aseguradora, codigo) = insurer_columns(insurers, event.aseguradora.as_deref());
        let valor = amount(event.valor);
        writer.write_record([
            event.numero_factura.as_str(),
            event.fecha_facturacion.as_str(),
            valor.as_str(),
            event.sede_nombre.as_deref().unwrap_or(""),
            aseguradora.as_str(),
            codigo.as_str(),
            event.documento_paciente.as_deref().unwrap_or(""),
            event.nombre_paciente.as_deref().unwrap_or(""),
            event.periodo.map(|p| p.as_str()).unwrap_or(""),
            event.fecha_inicio_servicio.as_deref().unwrap_or(""),
            event.fecha_fin_servicio.as_deref().unwrap_or(""),
        ])?;
    }

    Ok(writer.into_inner()?)
}

pub fn cancellations_csv(records: &[Cancellation], insurers: &InsurerDirectory) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Número Anulación",
        "Factura",
        "Tipo",
        "Fecha",
        "Valor",
        "Sede",
        "Aseguradora",
        "Código Aseguradora",
        "Motivo",
        "Facturas Reemplazo",
        "Fechas Reemplazo",
        "Valores Reemplazo",
    ])?;

    for record in records {
        let (aseguradora, codigo) = insurer_columns(insurers, record.aseguradora.as_deref());
        let valor = amount(record.valor);
        writer.write_record([
            record.numero_anulacion.as_str(),
            record.numero_factura.as_str(),
            record.tipo_registro.as_str(),
            record.fecha.as_str(),
            valor.as_str(),
            record.sede_nombre.as_deref().unwrap_or(""),
            aseguradora.as_str(),
            codigo.as_str(),
            record.motivo.as_deref().unwrap_or(""),
            record.facturas_reemplazo.as_deref().unwrap_or(""),
            record.fechas_reemplazo.as_deref().unwrap_or(""),
            record.valores_reemplazo.as_deref().unwrap_or(""),
        ])?;
    }

    Ok(writer.into_inner()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Insurer, Period};

    #[test]
    fn test_billing_export_maps_insurers() {
        let insurers = InsurerDirectory::from_insurers(&[Insurer {
            id: 1,
            nombre_pergamo: "NUEVA EPS S.A.".to_string(),
            nombre: "Nueva EPS".to_string(),
            codigo: "NEP".to_string(),
            created_at: 0,
            updated_at: 0,
        }]);
        let event = BillingEvent {
            id: 1,
            numero_factura: "FE-1".to_string(),
            fecha_facturacion: "2025-03-05".to_string(),
            valor: 1500.5,
            sede_id: 1,
            sede_nombre: Some("NORTE".to_string()),
            aseguradora: Some("Nueva EPS S.A.".to_string()),
            documento_paciente: None,
            nombre_paciente: Some("Pérez, Juan".to_string()),
            periodo: Some(Period::Remanente),
            fecha_inicio_servicio: None,
            fecha_fin_servicio: None,
            created_at: 0,
            updated_at: 0,
        };

        let bytes = billing_events_csv(&[event], &insurers).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Factura,"));
        assert_eq!(
            lines.next().unwrap(),
            "FE-1,2025-03-05,1500.50,NORTE,Nueva EPS,NEP,,\"Pérez, Juan\",REMANENTE,,"
        );
    }
}
