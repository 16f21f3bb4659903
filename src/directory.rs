//! 사용자 디렉터리 연동
//!
//! 프로필 저장/조회와 1차 후보 질의는 외부 협력 서비스의 책임이다.
//! 여기서는 소비하는 능력만 트레이트로 고정하고, 바이너리 배선과
//! 테스트용 인메모리 구현을 함께 둔다.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matching;

/// 성별
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// 선호 성별 (both 허용)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderPref {
    Male,
    Female,
    Both,
}

impl GenderPref {
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            GenderPref::Both => true,
            GenderPref::Male => gender == Gender::Male,
            GenderPref::Female => gender == Gender::Female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub city: Option<String>,
    pub coordinates: Option<Coordinates>,
}

/// 매칭 선호 조건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub age_min: u32,
    pub age_max: u32,
    pub gender: GenderPref,
    pub max_distance_km: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            age_min: 18,
            age_max: 100,
            gender: GenderPref::Both,
            max_distance_km: 50.0,
        }
    }
}

/// 최근 매치 이력. 24시간 재매칭 제외에만 쓰이고 삭제하지 않는다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMatchEntry {
    pub user_id: String,
    pub matched_at: DateTime<Utc>,
}

/// 사용자 프로필
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub age: u32,
    pub bio: String,
    pub gender: Gender,
    pub location: Location,
    pub preferences: Preferences,
    pub recent_matches: Vec<RecentMatchEntry>,
    pub blocked_users: Vec<String>,
    pub is_online: bool,
    pub last_active: DateTime<Utc>,
}

impl UserProfile {
    pub fn record_match(&mut self, other_user_id: &str) {
        self.recent_matches.push(RecentMatchEntry {
            user_id: other_user_id.to_string(),
            matched_at: Utc::now(),
        });
    }
}

/// 응답에 노출하는 공개 프로필
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub display_name: String,
    pub age: u32,
    pub bio: String,
    pub gender: Gender,
    pub city: Option<String>,
    pub is_online: bool,
}

impl From<&UserProfile> for PublicProfile {
    fn from(user: &UserProfile) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            age: user.age,
            bio: user.bio.clone(),
            gender: user.gender,
            city: user.location.city.clone(),
            is_online: user.is_online,
        }
    }
}

/// 디렉터리 오류
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory backend failure: {0}")]
    Backend(String),
}

/// 사용자 디렉터리 추상화
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>, DirectoryError>;

    async fn save_user(&self, user: &UserProfile) -> Result<(), DirectoryError>;

    /// 1차 후보 질의: 본인/차단/최근 24시간 매치 제외, 요청자의 나이 범위,
    /// 선호 성별이 both가 아니면 성별 일치까지. 거리 필터는 호출측 책임
    async fn find_candidates(
        &self,
        requester: &UserProfile,
    ) -> Result<Vec<UserProfile>, DirectoryError>;
}

const CANDIDATE_QUERY_LIMIT: usize = 50;

/// 인메모리 디렉터리 구현
#[derive(Default)]
pub struct MemoryDirectory {
    users: DashMap<String, UserProfile>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_user(&self, id: &str) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn save_user(&self, user: &UserProfile) -> Result<(), DirectoryError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_candidates(
        &self,
        requester: &UserProfile,
    ) -> Result<Vec<UserProfile>, DirectoryError> {
        let excluded = matching::recently_matched_ids(requester, Utc::now());
        let prefs = &requester.preferences;

        Ok(self
            .users
            .iter()
            .filter(|u| u.id != requester.id)
            .filter(|u| !requester.blocked_users.contains(&u.id))
            .filter(|u| !excluded.contains(&u.id))
            .filter(|u| u.age >= prefs.age_min && u.age <= prefs.age_max)
            .filter(|u| prefs.gender.accepts(u.gender))
            .take(CANDIDATE_QUERY_LIMIT)
            .map(|u| u.clone())
            .collect())
    }
}

/// 24시간 재매칭 제외 윈도우
pub const RECENCY_WINDOW_HOURS: i64 = 24;

pub fn recency_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(RECENCY_WINDOW_HOURS)
}
