//! 매치 레코드 저장소

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 매치 상태. 전이 규칙은 세션 코디네이터가 단독으로 소유한다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Active,
    Extended,
    Ended,
}

/// 참가자의 계속/종료 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Pending,
    Yes,
    No,
}

/// 영속 매치 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub status: MatchStatus,
    pub decision_a: Decision,
    pub decision_b: Decision,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub extended: bool,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn new(participant_a: String, participant_b: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            participant_a,
            participant_b,
            status: MatchStatus::Pending,
            decision_a: Decision::Pending,
            decision_b: Decision::Pending,
            started_at: None,
            ended_at: None,
            extended: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// pending/active/extended는 아직 살아 있는 매치
    pub fn is_live(&self) -> bool {
        !matches!(self.status, MatchStatus::Ended)
    }

    pub fn decision_of(&self, user_id: &str) -> Option<Decision> {
        if self.participant_a == user_id {
            Some(self.decision_a)
        } else if self.participant_b == user_id {
            Some(self.decision_b)
        } else {
            None
        }
    }

    /// 참가자 슬롯에 결정 기록. 참가자가 아니면 false
    pub fn set_decision(&mut self, user_id: &str, decision: Decision) -> bool {
        if self.participant_a == user_id {
            self.decision_a = decision;
            true
        } else if self.participant_b == user_id {
            self.decision_b = decision;
            true
        } else {
            false
        }
    }
}

/// 저장소 오류
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("match record not found: {0}")]
    NotFound(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// 매치 레코드 저장소 추상화. 외부 저장소로 교체 가능하도록 객체 안전하게 유지
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn insert(&self, record: MatchRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError>;

    /// 전이 한 건당 한 번의 쓰기. 존재하지 않는 레코드 저장은 NotFound
    async fn save(&self, record: &MatchRecord) -> Result<(), StoreError>;

    /// 사용자가 물려 있는 살아 있는 매치 조회 (참가자당 최대 1건 불변식)
    async fn live_match_for(&self, user_id: &str) -> Result<Option<MatchRecord>, StoreError>;

    /// cutoff 이전에 만들어졌고 아직 종결되지 않은 레코드 목록
    async fn stale_live_records(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MatchRecord>, StoreError>;
}

/// 인메모리 저장소 구현
#[derive(Default)]
pub struct MemoryMatchStore {
    records: DashMap<String, MatchRecord>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn insert(&self, record: MatchRecord) -> Result<(), StoreError> {
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn save(&self, record: &MatchRecord) -> Result<(), StoreError> {
        match self.records.get_mut(&record.id) {
            Some(mut slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(record.id.clone())),
        }
    }

    async fn live_match_for(&self, user_id: &str) -> Result<Option<MatchRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|r| r.is_live() && r.is_participant(user_id))
            .map(|r| r.clone()))
    }

    async fn stale_live_records(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.is_live() && r.created_at < cutoff)
            .map(|r| r.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn live_match_lookup_ignores_ended_records() {
        let store = MemoryMatchStore::new();
        let mut ended = MatchRecord::new("a".into(), "b".into());
        ended.status = MatchStatus::Ended;
        store.insert(ended).await.unwrap();

        assert!(store.live_match_for("a").await.unwrap().is_none());

        let live = MatchRecord::new("a".into(), "c".into());
        let live_id = live.id.clone();
        store.insert(live).await.unwrap();

        let found = store.live_match_for("a").await.unwrap().unwrap();
        assert_eq!(found.id, live_id);
        let found = store.live_match_for("c").await.unwrap().unwrap();
        assert_eq!(found.id, live_id);
    }

    #[tokio::test]
    async fn save_requires_existing_record() {
        let store = MemoryMatchStore::new();
        let record = MatchRecord::new("a".into(), "b".into());
        assert!(matches!(
            store.save(&record).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_scan_respects_cutoff_and_status() {
        let store = MemoryMatchStore::new();

        let mut old_live = MatchRecord::new("a".into(), "b".into());
        old_live.created_at = Utc::now() - Duration::seconds(3600);
        let old_id = old_live.id.clone();
        store.insert(old_live).await.unwrap();

        let mut old_ended = MatchRecord::new("c".into(), "d".into());
        old_ended.created_at = Utc::now() - Duration::seconds(3600);
        old_ended.status = MatchStatus::Ended;
        store.insert(old_ended).await.unwrap();

        store
            .insert(MatchRecord::new("e".into(), "f".into()))
            .await
            .unwrap();

        let cutoff = Utc::now() - Duration::seconds(600);
        let stale = store.stale_live_records(cutoff).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old_id);
    }
}
