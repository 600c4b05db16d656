use crate::error::AppError;
use crate::models::*;
use crate::services::GachaService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};

/// 从请求扩展中获取用户ID（中间件在鉴权后注入）
pub(crate) fn get_user_id_from_request(req: &HttpRequest) -> Result<i64, AppError> {
    req.extensions()
        .get::<i64>()
        .copied()
        .ok_or_else(|| AppError::AuthError("Missing user identity".into()))
}

#[utoipa::path(
    post,
    path = "/gacha/spin",
    tag = "gacha",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "抽卡成功", body = SpinResponse),
        (status = 400, description = "积分不足或物品池为空"),
        (status = 401, description = "未授权")
    )
)]
/// 单抽:
/// 1. 按稀有度权重抽取物品
/// 2. 条件扣减积分（余额不足直接失败）
/// 3. 写入抽卡记录、背包、通知、审计
/// 4. 返回物品与剩余积分
pub async fn spin(service: web::Data<GachaService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.spin(user_id).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gacha/spin/batch",
    tag = "gacha",
    request_body(content = BatchSpinRequest, description = "抽取次数，可省略"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "多连抽成功", body = BatchSpinResponse),
        (status = 400, description = "积分不足或物品池为空"),
        (status = 401, description = "未授权")
    )
)]
/// 多连抽：一次扣费，所有记录归入同一分组
/// 请求体可省略；非空但无法解析时直接返回 400，不扣费
pub async fn spin_batch(
    service: web::Data<GachaService>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    let request = match parse_batch_request(&body) {
        Ok(request) => request,
        Err(e) => return Ok(e.error_response()),
    };
    match service.spin_batch(user_id, request.count).await {
        Ok(result) => Ok(HttpResponse::Ok().json(ApiResponse::success(result))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 空请求体按默认次数处理
fn parse_batch_request(body: &[u8]) -> Result<BatchSpinRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BatchSpinRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::ValidationError(format!("Invalid batch spin request: {e}")))
}

#[utoipa::path(
    get,
    path = "/gacha/rates",
    tag = "gacha",
    responses(
        (status = 200, description = "获取概率公示成功", body = GachaRatesResponse)
    )
)]
/// 概率公示（公开）
pub async fn get_rates(service: web::Data<GachaService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(service.rates())))
}

#[utoipa::path(
    get,
    path = "/gacha/history",
    tag = "gacha",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取抽卡记录成功", body = [DrawHistoryEntry]),
        (status = 401, description = "未授权")
    )
)]
/// 最近 50 条抽卡记录（倒序）
pub async fn get_history(
    service: web::Data<GachaService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = match get_user_id_from_request(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };
    match service.history(user_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn gacha_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gacha")
            .route("/spin", web::post().to(spin))
            .route("/spin/batch", web::post().to(spin_batch))
            .route("/rates", web::get().to(get_rates))
            .route("/history", web::get().to(get_history)),
    );
}
