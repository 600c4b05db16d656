use actix_cors::Cors;

/// 抽卡接口只有 GET/POST；鉴权走 Authorization 头，不依赖 Cookie
pub fn create_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
