//! 라이브 세션 레지스트리
//!
//! 세션 id당 LiveSession은 최대 하나. 같은 세션의 이벤트는 내부
//! 뮤텍스로 직렬화되고, 카운트다운 핸들은 세대 번호로 식별해
//! 취소 후에 울리는 낡은 타이머를 걸러낸다.

use crate::helpers::HelperCategory;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// 취소 가능한 카운트다운 핸들
pub struct CountdownHandle {
    pub generation: u64,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn new(generation: u64, task: JoinHandle<()>) -> Self {
        Self { generation, task }
    }
}

/// 세션의 가변 상태. 반드시 LiveSession의 뮤텍스 안에서 접근
pub struct SessionInner {
    pub joined: HashSet<String>,
    pub started_at: Option<Instant>,
    countdown: Option<CountdownHandle>,
    pub used_helpers: HashMap<HelperCategory, HashSet<usize>>,
    generation_counter: u64,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            joined: HashSet::new(),
            started_at: None,
            countdown: None,
            used_helpers: HashMap::new(),
            generation_counter: 0,
        }
    }

    /// 새 타이머 세대 발급
    pub fn next_generation(&mut self) -> u64 {
        self.generation_counter += 1;
        self.generation_counter
    }

    pub fn set_countdown(&mut self, handle: CountdownHandle) {
        // 교체 전 기존 타이머는 반드시 중단
        self.clear_countdown(true);
        self.countdown = Some(handle);
    }

    /// 현재 등록된 타이머의 세대. 틱 콜백은 행동 전에 이것과 대조한다
    pub fn countdown_generation(&self) -> Option<u64> {
        self.countdown.as_ref().map(|c| c.generation)
    }

    /// 타이머 등록 해제. abort=false는 타이머 태스크 자신이 해제하는
    /// 경로 (자기 자신을 abort하면 남은 정리가 끊긴다)
    pub fn clear_countdown(&mut self, abort: bool) {
        if let Some(handle) = self.countdown.take() {
            if abort {
                handle.task.abort();
            }
        }
    }

    pub fn has_countdown(&self) -> bool {
        self.countdown.is_some()
    }
}

/// 라이브 세션. sessionId == MatchRecord.id
pub struct LiveSession {
    pub id: String,
    pub inner: Mutex<SessionInner>,
}

impl LiveSession {
    fn new(id: String) -> Self {
        Self {
            id,
            inner: Mutex::new(SessionInner::new()),
        }
    }
}

/// 세션 레지스트리
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<LiveSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 세션 조회 또는 생성. 양쪽 참가자가 동시에 join해도 엔트리는 하나다
    pub fn get_or_create(&self, session_id: &str) -> Arc<LiveSession> {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %session_id, "Live session created");
                Arc::new(LiveSession::new(session_id.to_string()))
            })
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<LiveSession>> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// 세션 파기: 타이머 취소 후 엔트리 제거. 없는 세션이면 no-op
    pub async fn destroy(&self, session_id: &str) {
        if let Some((_, session)) = self.sessions.remove(session_id) {
            session.inner.lock().await.clear_countdown(true);
            tracing::debug!(session_id = %session_id, "Live session destroyed");
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_joins_share_one_session() {
        let registry = Arc::new(SessionRegistry::new());

        let r1 = registry.clone();
        let r2 = registry.clone();
        let (s1, s2) = tokio::join!(
            tokio::spawn(async move { r1.get_or_create("m1") }),
            tokio::spawn(async move { r2.get_or_create("m1") }),
        );

        let s1 = s1.unwrap();
        let s2 = s2.unwrap();
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.get_or_create("m1");

        registry.destroy("m1").await;
        registry.destroy("m1").await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn generations_are_monotonic() {
        let registry = SessionRegistry::new();
        let session = registry.get_or_create("m1");
        let mut inner = session.inner.lock().await;
        let g1 = inner.next_generation();
        let g2 = inner.next_generation();
        assert!(g2 > g1);
    }
}
