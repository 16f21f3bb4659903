//! 후보 필터링과 매치 생성
//!
//! 거리/상호 조건 필터는 순수 함수로 유지한다. I/O는 `find_match`의
//! 디렉터리/저장소 호출에만 있다.

use chrono::DateTime;
use rand::seq::SliceRandom;

use crate::directory::{recency_cutoff, Coordinates, UserProfile};
use crate::error::MatchError;
use crate::state::AppState;
use crate::store::MatchRecord;

/// 지구 반지름 (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 하버사인 대원 거리 (km)
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// 요청자의 최근 24시간 매치 상대 목록
pub fn recently_matched_ids(user: &UserProfile, now: DateTime<chrono::Utc>) -> Vec<String> {
    let cutoff = recency_cutoff(now);
    user.recent_matches
        .iter()
        .filter(|m| m.matched_at > cutoff)
        .map(|m| m.user_id.clone())
        .collect()
}

/// 2차 필터: 거리 상한(경계 포함), 상호 나이 조건, 후보의 선호 성별.
/// 좌표 없는 후보는 제외
pub fn filter_candidates<'a>(
    requester: &UserProfile,
    requester_coords: &Coordinates,
    candidates: &'a [UserProfile],
) -> Vec<&'a UserProfile> {
    candidates
        .iter()
        .filter(|c| {
            let Some(coords) = &c.location.coordinates else {
                return false;
            };
            if haversine_km(requester_coords, coords) > requester.preferences.max_distance_km {
                return false;
            }
            if requester.age < c.preferences.age_min || requester.age > c.preferences.age_max {
                return false;
            }
            c.preferences.gender.accepts(requester.gender)
        })
        .collect()
}

/// 매치 탐색 결과. 후보 없음은 오류가 아니다
#[derive(Debug)]
pub enum FindMatchOutcome {
    Found {
        record: MatchRecord,
        candidate: UserProfile,
    },
    NoCandidate,
}

/// 후보 탐색부터 pending 매치 레코드 생성까지
pub async fn find_match(
    state: &AppState,
    requester_id: &str,
) -> Result<FindMatchOutcome, MatchError> {
    let Some(mut requester) = state.directory.get_user(requester_id).await? else {
        return Err(MatchError::UserNotFound(requester_id.to_string()));
    };

    let Some(requester_coords) = requester.location.coordinates else {
        return Err(MatchError::LocationNotSet);
    };

    // 참가자당 살아 있는 매치는 1건 불변식
    if state.store.live_match_for(requester_id).await?.is_some() {
        return Err(MatchError::ActiveMatchExists);
    }

    let candidates = state.directory.find_candidates(&requester).await?;
    let mut filtered = filter_candidates(&requester, &requester_coords, &candidates);
    filtered.shuffle(&mut rand::thread_rng());

    // 무작위 순서로 훑으며 이미 매치에 물린 후보는 건너뜀
    let mut chosen: Option<&UserProfile> = None;
    for candidate in filtered.iter().copied() {
        if state.store.live_match_for(&candidate.id).await?.is_none() {
            chosen = Some(candidate);
            break;
        }
    }

    let Some(candidate) = chosen else {
        tracing::info!(requester = %requester_id, "No candidate available");
        return Ok(FindMatchOutcome::NoCandidate);
    };

    let record = MatchRecord::new(requester.id.clone(), candidate.id.clone());
    state.store.insert(record.clone()).await?;

    requester.record_match(&candidate.id);
    state.directory.save_user(&requester).await?;

    tracing::info!(
        match_id = %record.id,
        requester = %requester.id,
        candidate = %candidate.id,
        "Match created"
    );

    Ok(FindMatchOutcome::Found {
        record,
        candidate: candidate.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Gender, GenderPref, Location, Preferences, RecentMatchEntry};
    use chrono::{Duration, Utc};

    fn profile(id: &str, age: u32, gender: Gender, lat: f64, lng: f64) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            display_name: id.to_string(),
            age,
            bio: String::new(),
            gender,
            location: Location {
                city: None,
                coordinates: Some(Coordinates { lat, lng }),
            },
            preferences: Preferences::default(),
            recent_matches: vec![],
            blocked_users: vec![],
            is_online: true,
            last_active: Utc::now(),
        }
    }

    #[test]
    fn haversine_is_symmetric() {
        let seoul = Coordinates {
            lat: 37.5665,
            lng: 126.9780,
        };
        let busan = Coordinates {
            lat: 35.1796,
            lng: 129.0756,
        };
        let d1 = haversine_km(&seoul, &busan);
        let d2 = haversine_km(&busan, &seoul);
        assert!((d1 - d2).abs() < 1e-6);
        // 서울-부산은 약 325km
        assert!(d1 > 300.0 && d1 < 350.0);
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = Coordinates {
            lat: 37.5665,
            lng: 126.9780,
        };
        assert!(haversine_km(&p, &p).abs() < 1e-9);
    }

    #[test]
    fn max_distance_boundary_is_inclusive() {
        let requester = profile("req", 30, Gender::Female, 37.5665, 126.9780);
        let mut candidate = profile("cand", 30, Gender::Male, 37.6, 127.1);

        let req_coords = requester.location.coordinates.unwrap();
        let distance = haversine_km(&req_coords, &candidate.location.coordinates.unwrap());

        // 상한을 정확히 그 거리로 두면 포함되어야 한다
        let mut at_limit = requester.clone();
        at_limit.preferences.max_distance_km = distance;
        let kept = filter_candidates(&at_limit, &req_coords, std::slice::from_ref(&candidate));
        assert_eq!(kept.len(), 1);

        // 상한보다 조금이라도 멀면 제외
        let mut below_limit = requester.clone();
        below_limit.preferences.max_distance_km = distance - 0.001;
        let kept = filter_candidates(&below_limit, &req_coords, std::slice::from_ref(&candidate));
        assert!(kept.is_empty());

        // 좌표 없는 후보는 제외
        candidate.location.coordinates = None;
        let kept = filter_candidates(&requester, &req_coords, std::slice::from_ref(&candidate));
        assert!(kept.is_empty());
    }

    #[test]
    fn mutual_age_fit_is_required() {
        let requester = profile("req", 45, Gender::Female, 37.5665, 126.9780);
        let req_coords = requester.location.coordinates.unwrap();

        // 후보의 선호 나이 범위가 요청자를 받아들이지 않으면 탈락
        let mut candidate = profile("cand", 30, Gender::Male, 37.57, 126.98);
        candidate.preferences.age_max = 40;
        let kept = filter_candidates(&requester, &req_coords, std::slice::from_ref(&candidate));
        assert!(kept.is_empty());

        candidate.preferences.age_max = 50;
        let kept = filter_candidates(&requester, &req_coords, std::slice::from_ref(&candidate));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn candidate_gender_preference_must_accept_requester() {
        let requester = profile("req", 30, Gender::Male, 37.5665, 126.9780);
        let req_coords = requester.location.coordinates.unwrap();

        let mut candidate = profile("cand", 30, Gender::Female, 37.57, 126.98);
        candidate.preferences.gender = GenderPref::Female;
        let kept = filter_candidates(&requester, &req_coords, std::slice::from_ref(&candidate));
        assert!(kept.is_empty());

        candidate.preferences.gender = GenderPref::Both;
        let kept = filter_candidates(&requester, &req_coords, std::slice::from_ref(&candidate));
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn recency_window_ignores_old_entries() {
        let mut user = profile("req", 30, Gender::Male, 37.5665, 126.9780);
        let now = Utc::now();
        user.recent_matches = vec![
            RecentMatchEntry {
                user_id: "fresh".to_string(),
                matched_at: now - Duration::hours(1),
            },
            RecentMatchEntry {
                user_id: "old".to_string(),
                matched_at: now - Duration::hours(25),
            },
        ];

        let excluded = recently_matched_ids(&user, now);
        assert_eq!(excluded, vec!["fresh".to_string()]);
    }
}
