//! HTTP handler functions for the openPAQ API.

use actix_web::{HttpResponse, web};
use openpaq_models::Input;
use openpaq_server_models::{ApiError, ApiVersion, CheckQueryParams};

use crate::AppState;

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// `GET /version`
pub async fn version(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiVersion {
        version: state.checker.version().to_string(),
    })
}

/// `GET /api/v1/check`
///
/// Returns the verdict for one address, with the evidence trail when
/// `debug_details=true`.
pub async fn check(
    state: web::Data<AppState>,
    params: web::Query<CheckQueryParams>,
) -> HttpResponse {
    if let Err(error) = params.validate() {
        return HttpResponse::BadRequest().json(ApiError { error });
    }

    let params = params.into_inner();
    let debug_details = params.wants_debug_details();
    let input = Input {
        street: params.street,
        city: params.city,
        postal_code: params.postal_code,
        country_code: params.country_code,
    };

    let result = state.checker.check(&input).await;

    if debug_details {
        HttpResponse::Ok().json(result)
    } else {
        HttpResponse::Ok().json(result.result)
    }
}
