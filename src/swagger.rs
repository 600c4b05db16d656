use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::Rarity;
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::gacha::spin,
        handlers::gacha::spin_batch,
        handlers::gacha::get_rates,
        handlers::gacha::get_history,
        handlers::points::get_balance,
    ),
    components(
        schemas(
            Rarity,
            ItemSummary,
            DrawRecordResponse,
            InventoryEntryResponse,
            SpinResult,
            SpinResponse,
            BatchSpinRequest,
            BatchSpinResponse,
            GachaRatesResponse,
            DrawHistoryEntry,
            PointsBalanceResponse,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "gacha", description = "Gacha spin API"),
        (name = "points", description = "Points balance API"),
    ),
    info(
        title = "Points Gacha Backend API",
        version = "1.0.0",
        description = "Points and gacha REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
