use serde::{Deserialize, Serialize};
use std::env;

/// 多连抽次数硬上限，配置值超过时按此截断
pub const MAX_BATCH_HARD_CAP: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub gacha: GachaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expires_in")]
    pub access_token_expires_in: i64,
}

fn default_access_token_expires_in() -> i64 {
    3600
}

/// 抽卡参数，构造 GachaService 时显式传入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GachaConfig {
    /// 单抽价格（积分）
    #[serde(default = "default_cost_per_draw")]
    pub cost_per_draw: i64,
    /// 多连抽次数上限
    #[serde(default = "default_max_batch")]
    pub max_batch: i64,
}

fn default_cost_per_draw() -> i64 {
    10
}

fn default_max_batch() -> i64 {
    MAX_BATCH_HARD_CAP
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            cost_per_draw: default_cost_per_draw(),
            max_batch: default_max_batch(),
        }
    }
}

impl GachaConfig {
    /// 实际生效的多连抽上限: [1, 100]
    pub fn effective_max_batch(&self) -> i64 {
        self.max_batch.clamp(1, MAX_BATCH_HARD_CAP)
    }

    /// 将请求的抽取次数截断到 [1, effective_max_batch]
    pub fn clamp_batch_count(&self, requested: i64) -> i64 {
        requested.clamp(1, self.effective_max_batch())
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is required when config.toml is absent")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse(
                            "JWT_ACCESS_TOKEN_EXPIRES_IN",
                            default_access_token_expires_in(),
                        ),
                    },
                    gacha: GachaConfig {
                        cost_per_draw: get_env_parse("GACHA_COST_PER_DRAW", default_cost_per_draw()),
                        max_batch: get_env_parse("GACHA_MAX_BATCH", default_max_batch()),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("GACHA_COST_PER_DRAW")
            && let Ok(n) = v.parse()
        {
            config.gacha.cost_per_draw = n;
        }
        if let Ok(v) = env::var("GACHA_MAX_BATCH")
            && let Ok(n) = v.parse()
        {
            config.gacha.max_batch = n;
        }

        config.validate()?;
        Ok(config)
    }

    fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gacha.cost_per_draw <= 0 {
            return Err("gacha.cost_per_draw must be positive".into());
        }
        if self.gacha.max_batch > MAX_BATCH_HARD_CAP {
            log::warn!(
                "gacha.max_batch={} exceeds hard cap, using {}",
                self.gacha.max_batch,
                MAX_BATCH_HARD_CAP
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
url = "postgres://localhost/gacha"
max_connections = 5

[jwt]
secret = "test"
"#;

    #[test]
    fn gacha_section_defaults_when_absent() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.gacha.cost_per_draw, 10);
        assert_eq!(config.gacha.max_batch, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn gacha_section_overrides_defaults() {
        let toml = format!("{SAMPLE}\n[gacha]\ncost_per_draw = 25\nmax_batch = 20\n");
        let config = Config::parse(&toml).unwrap();
        assert_eq!(config.gacha.cost_per_draw, 25);
        assert_eq!(config.gacha.effective_max_batch(), 20);
    }

    #[test]
    fn batch_count_is_clamped_to_hard_cap() {
        let gacha = GachaConfig {
            cost_per_draw: 10,
            max_batch: 500,
        };
        assert_eq!(gacha.effective_max_batch(), 100);
        assert_eq!(gacha.clamp_batch_count(500), 100);
        assert_eq!(gacha.clamp_batch_count(0), 1);
        assert_eq!(gacha.clamp_batch_count(-3), 1);
        assert_eq!(gacha.clamp_batch_count(42), 42);
    }

    #[test]
    fn non_positive_cost_is_rejected() {
        let toml = format!("{SAMPLE}\n[gacha]\ncost_per_draw = 0\n");
        let config = Config::parse(&toml).unwrap();
        assert!(config.validate().is_err());
    }
}
