use super::gacha::get_user_id_from_request;
use crate::models::*;
use crate::services::GachaService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/points/balance",
    tag = "points",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取积分余额成功", body = PointsBalanceResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "用户不存在")
    )
)]
/// 当前用户积分余额
pub async fn get_balance(
    service: web::Data<GachaService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.balance(user_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(ApiResponse::success(data))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn points_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/points").route("/balance", web::get().to(get_balance)));
}
