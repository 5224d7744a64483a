use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username VARCHAR NOT NULL UNIQUE,
            nombre VARCHAR NOT NULL,
            password_hash VARCHAR NOT NULL,
            rol VARCHAR NOT NULL DEFAULT 'usuario' CHECK (rol IN ('admin', 'usuario')),
            activo BOOLEAN NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS aseguradora (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre_pergamo VARCHAR NOT NULL UNIQUE,
            nombre VARCHAR NOT NULL,
            codigo VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sede (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre VARCHAR NOT NULL UNIQUE,
            ciudad VARCHAR,
            activo BOOLEAN NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS facturacion_evento (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_factura VARCHAR NOT NULL,
            numero_normalizado VARCHAR NOT NULL,
            fecha_facturacion VARCHAR NOT NULL,
            valor DOUBLE NOT NULL DEFAULT 0,
            sede_id INTEGER NOT NULL,
            aseguradora VARCHAR,
            documento_paciente VARCHAR,
            nombre_paciente VARCHAR,
            periodo VARCHAR CHECK (periodo IN ('CORRIENTE', 'REMANENTE', 'ANULADA')),
            fecha_inicio_servicio VARCHAR,
            fecha_fin_servicio VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (sede_id) REFERENCES sede (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS anulacion (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_anulacion VARCHAR NOT NULL,
            numero_normalizado VARCHAR NOT NULL,
            numero_factura VARCHAR NOT NULL,
            factura_normalizada VARCHAR NOT NULL,
            tipo_registro VARCHAR NOT NULL CHECK (tipo_registro IN ('Anulación', 'Nota Crédito')),
            fecha VARCHAR NOT NULL,
            valor DOUBLE NOT NULL DEFAULT 0,
            sede_id INTEGER NOT NULL,
            aseguradora VARCHAR,
            motivo VARCHAR,
            facturas_reemplazo VARCHAR,
            fechas_reemplazo VARCHAR,
            valores_reemplazo VARCHAR,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (sede_id) REFERENCES sede (id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rips_factura (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            numero_factura VARCHAR NOT NULL,
            factura_normalizada VARCHAR NOT NULL,
            codigo_cups VARCHAR NOT NULL,
            documento_paciente VARCHAR,
            fecha_inicio VARCHAR,
            fecha_fin VARCHAR,
            valor DOUBLE NOT NULL DEFAULT 0,
            sede VARCHAR,
            created_at BIGINT NOT NULL,
            UNIQUE (factura_normalizada, codigo_cups)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reporte_rips (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fecha_inicial VARCHAR NOT NULL,
            fecha_final VARCHAR NOT NULL,
            total_registros BIGINT NOT NULL,
            insertados BIGINT NOT NULL,
            duplicados BIGINT NOT NULL,
            user_id INTEGER,
            created_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cup (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            codigo VARCHAR NOT NULL UNIQUE,
            descripcion VARCHAR NOT NULL,
            activo BOOLEAN NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cup_assignment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cup_id INTEGER NOT NULL,
            sede_id INTEGER NOT NULL,
            created_at BIGINT NOT NULL,
            UNIQUE (cup_id, sede_id),
            FOREIGN KEY (cup_id) REFERENCES cup (id) ON DELETE CASCADE,
            FOREIGN KEY (sede_id) REFERENCES sede (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ultima_actualizacion (
            tipo VARCHAR PRIMARY KEY CHECK (tipo IN ('facturacion', 'anulaciones')),
            fecha_inicial VARCHAR NOT NULL,
            fecha_final VARCHAR NOT NULL,
            user_id INTEGER,
            actualizado_en BIGINT NOT NULL
        )",
        [],
    )?;

    // Create indexes for performance
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_evento_numero ON facturacion_evento(numero_normalizado)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evento_fecha ON facturacion_evento(fecha_facturacion)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evento_sede ON facturacion_evento(sede_id)",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_anulacion_numero ON anulacion(numero_normalizado)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_anulacion_fecha ON anulacion(fecha)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_rips_factura ON rips_factura(factura_normalizada)",
        [],
    )?;

    Ok(())
}
