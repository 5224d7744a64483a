use actix_web::web;

use crate::handlers::{
    auth, billing, cancellations, cups, facilities, health, insurers, pergamo, users,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health))
        .route("/api/auth/login", web::post().to(auth::login))
        .route("/api/auth/me", web::get().to(auth::me))
        .route("/api/pergamo/login", web::post().to(pergamo::login))
        .route(
            "/api/facturacion/cargar",
            web::post().to(billing::sync_billing),
        )
        .route(
            "/api/facturacion/eventos",
            web::get().to(billing::list_events),
        )
        .route(
            "/api/facturacion/evento/{id}/periodo",
            web::patch().to(billing::update_event_period),
        )
        .route(
            "/api/facturacion/completar-periodos",
            web::post().to(billing::backfill_periods),
        )
        .route(
            "/api/facturacion/resumen",
            web::get().to(billing::get_summary),
        )
        .route(
            "/api/facturacion/ultima-actualizacion",
            web::get().to(billing::get_last_update),
        )
        .route(
            "/api/facturacion/reportes-rips",
            web::get().to(billing::list_rips_reports),
        )
        .route(
            "/api/facturacion/rips",
            web::get().to(billing::list_invoice_rips),
        )
        .route(
            "/api/facturacion/exportar",
            web::get().to(billing::export_events),
        )
        .route(
            "/api/anulaciones",
            web::get().to(cancellations::list_cancellations),
        )
        .route(
            "/api/anulaciones/cargar",
            web::post().to(cancellations::sync_cancellations),
        )
        .route(
            "/api/anulaciones/cargar-plano",
            web::post().to(cancellations::upload_replacements),
        )
        .route(
            "/api/anulaciones/ultima-actualizacion",
            web::get().to(cancellations::get_last_update),
        )
        .route(
            "/api/anulaciones/exportar",
            web::get().to(cancellations::export_cancellations),
        )
        .route("/api/aseguradoras", web::get().to(insurers::list_insurers))
        .route(
            "/api/aseguradoras",
            web::post().to(insurers::create_insurer),
        )
        .route(
            "/api/aseguradoras/{id}",
            web::get().to(insurers::get_insurer),
        )
        .route(
            "/api/aseguradoras/{id}",
            web::put().to(insurers::update_insurer),
        )
        .route(
            "/api/aseguradoras/{id}",
            web::delete().to(insurers::delete_insurer),
        )
        .route("/api/sedes", web::get().to(facilities::list_facilities))
        .route("/api/sedes", web::post().to(facilities::create_facility))
        .route("/api/sedes/{id}", web::get().to(facilities::get_facility))
        .route(
            "/api/sedes/{id}",
            web::put().to(facilities::update_facility),
        )
        .route(
            "/api/sedes/{id}",
            web::delete().to(facilities::delete_facility),
        )
        .route(
            "/api/cups/asignaciones/{id}",
            web::delete().to(cups::delete_assignment),
        )
        .route("/api/cups", web::get().to(cups::list_cups))
        .route("/api/cups", web::post().to(cups::create_cup))
        .route("/api/cups/{id}", web::get().to(cups::get_cup))
        .route("/api/cups/{id}", web::put().to(cups::update_cup))
        .route("/api/cups/{id}", web::delete().to(cups::delete_cup))
        .route(
            "/api/cups/{id}/asignaciones",
            web::get().to(cups::list_assignments),
        )
        .route(
            "/api/cups/{id}/asignaciones",
            web::post().to(cups::create_assignment),
        )
        .route("/api/users", web::get().to(users::list_users))
        .route("/api/users", web::post().to(users::create_user))
        .route("/api/users/{id}", web::get().to(users::get_user))
        .route("/api/users/{id}", web::put().to(users::update_user))
        .route("/api/users/{id}", web::delete().to(users::delete_user));
}
