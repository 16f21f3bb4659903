//! 환경 변수 기반 설정 관리

use std::env;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    #[allow(dead_code)]
    pub cors_origins: Vec<String>,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub sweep: SweepConfig,
    pub log_level: String,
}

/// 매치 세션 설정
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 세션 카운트다운 길이 (초)
    pub window_secs: u64,
    /// 단독 yes를 자동 연장 처리하는 테스트 전용 플래그 (기본 off)
    pub auto_accept_solo: bool,
}

/// 신원 토큰 설정
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub token_ttl: u64,
}

/// 비종결 매치 레코드 정리 설정
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub interval_secs: u64,
    pub grace_secs: u64,
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "5601".to_string())
                .parse()
                .unwrap_or(5601),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3600".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            session: SessionConfig {
                window_secs: env::var("SESSION_WINDOW_SECS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()
                    .unwrap_or(180),
                auto_accept_solo: env::var("TESTING_AUTO_ACCEPT")
                    .map(|v| v == "true")
                    .unwrap_or(false),
            },
            auth: AuthConfig {
                secret: env::var("AUTH_SECRET").unwrap_or_default(),
                token_ttl: env::var("AUTH_TOKEN_TTL")
                    .unwrap_or_else(|_| "86400".to_string())
                    .parse()
                    .unwrap_or(86400),
            },
            sweep: SweepConfig {
                interval_secs: env::var("SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                grace_secs: env::var("STALE_GRACE_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .unwrap_or(600),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
