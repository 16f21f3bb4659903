//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::directory::UserDirectory;
use crate::helpers::HelperBank;
use crate::relay::ConnectionRegistry;
use crate::session::registry::SessionRegistry;
use crate::store::MatchStore;
use std::sync::Arc;

/// 전역 애플리케이션 상태. 레지스트리들은 명시적으로 여기서 생성되고
/// 프로세스와 함께 수명이 끝난다 (전역 가변 맵 금지)
pub struct AppState {
    /// 사용자 채널 바인딩 (시그널링 중계)
    pub connections: ConnectionRegistry,
    /// 라이브 세션 레지스트리
    pub sessions: SessionRegistry,
    /// 매치 레코드 저장소
    pub store: Arc<dyn MatchStore>,
    /// 사용자 디렉터리 (외부 협력 서비스)
    pub directory: Arc<dyn UserDirectory>,
    /// 대화 도우미 뱅크
    pub helpers: HelperBank,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn MatchStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            sessions: SessionRegistry::new(),
            store,
            directory,
            helpers: HelperBank::builtin(),
            config: Arc::new(config),
        }
    }
}
