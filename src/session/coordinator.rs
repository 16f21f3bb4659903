//! 매치 세션 코디네이터
//!
//! 전이 표는 여기 한 곳에만 있다. 같은 세션의 이벤트는 세션 뮤텍스로
//! 직렬화되고, 영속 쓰기가 성공한 뒤에만 메모리 상태와 브로드캐스트가
//! 따라간다. 쓰기 실패는 호출자에게 그대로 올라가고 상태는 남지 않는다.

use crate::error::MatchError;
use crate::helpers::HelperCategory;
use crate::protocol::ServerMessage;
use crate::session::registry::{CountdownHandle, LiveSession, SessionInner};
use crate::state::AppState;
use crate::store::{Decision, MatchRecord, MatchStatus};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant};

/// 세션에 합류한 참가자 전원에게 전송
fn broadcast_to_session(state: &AppState, inner: &SessionInner, message: ServerMessage) {
    for user_id in &inner.joined {
        state.connections.send_to(user_id, message.clone());
    }
}

fn broadcast_to_session_except(
    state: &AppState,
    inner: &SessionInner,
    except_user_id: &str,
    message: ServerMessage,
) {
    for user_id in &inner.joined {
        if user_id != except_user_id {
            state.connections.send_to(user_id, message.clone());
        }
    }
}

async fn load_record(state: &AppState, session_id: &str) -> Result<MatchRecord, MatchError> {
    state
        .store
        .get(session_id)
        .await?
        .ok_or_else(|| MatchError::MatchNotFound(session_id.to_string()))
}

/// 참가자 합류. pending 레코드는 active로 전이하고 카운트다운을 건다
pub async fn handle_join(
    state: &Arc<AppState>,
    user_id: &str,
    session_id: &str,
) -> Result<(), MatchError> {
    let record = load_record(state, session_id).await?;
    if !record.is_participant(user_id) {
        return Err(MatchError::NotParticipant);
    }
    if !record.is_live() {
        return Err(MatchError::MatchClosed(session_id.to_string()));
    }

    let session = state.sessions.get_or_create(session_id);
    let mut inner = session.inner.lock().await;
    inner.joined.insert(user_id.to_string());

    match record.status {
        MatchStatus::Pending => {
            // 전이: pending → active. 저장이 성공해야 타이머가 돈다
            let mut next = record.clone();
            next.status = MatchStatus::Active;
            next.started_at = Some(Utc::now());
            state.store.save(&next).await?;

            inner.started_at = Some(Instant::now());
            broadcast_to_session(
                state,
                &inner,
                ServerMessage::SessionStarted {
                    session_id: session_id.to_string(),
                },
            );
            start_countdown(state, &session, &mut inner);

            tracing::info!(session_id = %session_id, user_id = %user_id, "Session started");
        }
        MatchStatus::Active => {
            // 세션이 내려간 뒤의 재합류: 영속 startedAt 기준으로 남은
            // 시간부터 카운트다운을 재개한다
            if !inner.has_countdown() {
                let elapsed = record
                    .started_at
                    .map(|t| (Utc::now() - t).num_seconds().max(0) as u64)
                    .unwrap_or(0);
                inner.started_at = Instant::now()
                    .checked_sub(Duration::from_secs(elapsed))
                    .or(Some(Instant::now()));
                start_countdown(state, &session, &mut inner);
                tracing::info!(session_id = %session_id, elapsed, "Countdown resumed");
            }
        }
        // extended는 시간 제한이 없다
        MatchStatus::Extended | MatchStatus::Ended => {}
    }

    let user_count = inner.joined.len();
    state.connections.send_to(
        user_id,
        ServerMessage::SessionJoined {
            session_id: session_id.to_string(),
            user_count,
        },
    );

    tracing::info!(
        session_id = %session_id,
        user_id = %user_id,
        user_count = user_count,
        "User joined session"
    );
    Ok(())
}

/// 새 세대의 카운트다운 타이머 등록. 호출자가 세션 락을 쥐고 있어야 한다
fn start_countdown(state: &Arc<AppState>, session: &Arc<LiveSession>, inner: &mut SessionInner) {
    let generation = inner.next_generation();
    let task = spawn_countdown(state.clone(), session.clone(), generation);
    inner.set_countdown(CountdownHandle::new(generation, task));
}

fn spawn_countdown(
    state: Arc<AppState>,
    session: Arc<LiveSession>,
    generation: u64,
) -> JoinHandle<()> {
    let window = state.config.session.window_secs as i64;

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        // interval의 첫 틱은 즉시 발화하므로 소모
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let timed_out = {
                let inner = session.inner.lock().await;
                // 취소되었거나 교체된 타이머는 행동하지 않고 죽는다
                if inner.countdown_generation() != Some(generation) {
                    break;
                }
                let Some(started_at) = inner.started_at else {
                    break;
                };

                let elapsed = started_at.elapsed().as_secs() as i64;
                let remaining = window - elapsed;
                broadcast_to_session(
                    &state,
                    &inner,
                    ServerMessage::SessionTick {
                        session_id: session.id.clone(),
                        remaining,
                        elapsed,
                    },
                );
                remaining <= 0
            };

            if timed_out {
                handle_timeout(&state, &session).await;
                break;
            }
        }
    })
}

/// 카운트다운 만료. 타이머 태스크에서만 호출된다
async fn handle_timeout(state: &AppState, session: &Arc<LiveSession>) {
    let mut inner = session.inner.lock().await;
    // 같은 틱에서의 재발화 방지. 자기 자신이므로 abort는 하지 않는다
    inner.clear_countdown(false);

    let record = match state.store.get(&session.id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::warn!(session_id = %session.id, "Timeout for unknown match record");
            return;
        }
        Err(e) => {
            tracing::error!(session_id = %session.id, error = %e, "Timeout record load failed");
            return;
        }
    };

    // active에서만 만료가 유효하다 (연장/종료 뒤에 도착한 낡은 틱은 무시)
    if record.status != MatchStatus::Active {
        return;
    }

    let mut next = record;
    next.status = MatchStatus::Ended;
    next.ended_at = Some(Utc::now());
    if let Err(e) = state.store.save(&next).await {
        // 레코드는 active로 남는다. 스윕이 유예 기간 후 정리한다
        tracing::error!(session_id = %session.id, error = %e, "Failed to persist timeout");
        return;
    }

    broadcast_to_session(
        state,
        &inner,
        ServerMessage::SessionTimedOut {
            session_id: session.id.clone(),
        },
    );
    drop(inner);

    state.sessions.destroy(&session.id).await;
    tracing::info!(session_id = %session.id, "Session timed out");
}

/// 결정 제출. 같은 값 재제출은 멱등 no-op이고, no는 흡수적이다
pub async fn handle_decision(
    state: &Arc<AppState>,
    user_id: &str,
    session_id: &str,
    decision: Decision,
) -> Result<(), MatchError> {
    if decision == Decision::Pending {
        return Err(MatchError::InvalidDecision);
    }

    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| MatchError::SessionNotFound(session_id.to_string()))?;
    let mut inner = session.inner.lock().await;

    let record = load_record(state, session_id).await?;
    if !record.is_participant(user_id) {
        return Err(MatchError::NotParticipant);
    }
    if !record.is_live() {
        return Err(MatchError::MatchClosed(session_id.to_string()));
    }

    // decision_of는 참가자 확인 후이므로 항상 Some
    if record.decision_of(user_id) == Some(decision) {
        tracing::debug!(session_id = %session_id, user_id = %user_id, "Duplicate decision ignored");
        return Ok(());
    }

    let mut next = record.clone();
    next.set_decision(user_id, decision);

    enum Outcome {
        Extended,
        Ended,
        Wait,
    }

    let outcome = if next.decision_a == Decision::Yes && next.decision_b == Decision::Yes {
        next.status = MatchStatus::Extended;
        next.extended = true;
        Outcome::Extended
    } else if next.decision_a == Decision::No || next.decision_b == Decision::No {
        next.status = MatchStatus::Ended;
        next.ended_at = Some(Utc::now());
        Outcome::Ended
    } else if decision == Decision::Yes && state.config.session.auto_accept_solo {
        // 테스트 모드 전용: 단독 yes를 상호 수락으로 간주한다
        next.decision_a = Decision::Yes;
        next.decision_b = Decision::Yes;
        next.status = MatchStatus::Extended;
        next.extended = true;
        tracing::warn!(session_id = %session_id, "Solo yes auto-accepted (testing mode)");
        Outcome::Extended
    } else {
        Outcome::Wait
    };

    state.store.save(&next).await?;

    match outcome {
        Outcome::Extended => {
            inner.clear_countdown(true);
            broadcast_to_session(
                state,
                &inner,
                ServerMessage::SessionExtended {
                    session_id: session_id.to_string(),
                },
            );
            tracing::info!(session_id = %session_id, "Session extended");
        }
        Outcome::Ended => {
            broadcast_to_session(
                state,
                &inner,
                ServerMessage::SessionEnded {
                    session_id: session_id.to_string(),
                    mutual: false,
                    decision_a: next.decision_a,
                    decision_b: next.decision_b,
                },
            );
            drop(inner);
            state.sessions.destroy(session_id).await;
            tracing::info!(session_id = %session_id, "Session ended by decision");
        }
        Outcome::Wait => {
            tracing::debug!(session_id = %session_id, user_id = %user_id, "Decision recorded, waiting for peer");
        }
    }
    Ok(())
}

/// 스킵: 스킵한 쪽의 결정을 no로 강제하고 즉시 종료.
/// 상대가 한 번도 연결되지 않았어도 스킵 당사자에게는 직접 전달한다
pub async fn handle_skip(
    state: &Arc<AppState>,
    user_id: &str,
    session_id: &str,
) -> Result<(), MatchError> {
    let session = state.sessions.get(session_id);
    let mut guard = match &session {
        Some(s) => Some(s.inner.lock().await),
        None => None,
    };

    let record = load_record(state, session_id).await?;
    if !record.is_participant(user_id) {
        return Err(MatchError::NotParticipant);
    }
    if !record.is_live() {
        return Err(MatchError::MatchClosed(session_id.to_string()));
    }

    let mut next = record.clone();
    next.status = MatchStatus::Ended;
    next.ended_at = Some(Utc::now());
    next.set_decision(user_id, Decision::No);
    state.store.save(&next).await?;

    let message = ServerMessage::SessionSkipped {
        session_id: session_id.to_string(),
        skipped_by: user_id.to_string(),
    };
    state.connections.send_to(user_id, message.clone());

    if let Some(inner) = guard.take() {
        broadcast_to_session_except(state, &inner, user_id, message);
        drop(inner);
    }
    if session.is_some() {
        state.sessions.destroy(session_id).await;
    }

    tracing::info!(session_id = %session_id, skipped_by = %user_id, "Session skipped");
    Ok(())
}

/// 세션 이탈. 마지막 참가자가 나가면 세션을 파기하되 레코드는 건드리지 않는다
pub async fn handle_leave(state: &Arc<AppState>, user_id: &str, session_id: &str) {
    let Some(session) = state.sessions.get(session_id) else {
        tracing::debug!(session_id = %session_id, "Leave for unknown session ignored");
        return;
    };

    let mut inner = session.inner.lock().await;
    inner.joined.remove(user_id);
    let empty = inner.joined.is_empty();
    if empty {
        inner.clear_countdown(true);
    }
    drop(inner);

    if empty {
        state.sessions.destroy(session_id).await;
    }

    tracing::info!(
        session_id = %session_id,
        user_id = %user_id,
        destroyed = empty,
        "User left session"
    );
}

/// 대화 도우미 요청. 소진된 카테고리는 침묵 대신 HelperUnavailable
pub async fn handle_helper_request(
    state: &Arc<AppState>,
    session_id: &str,
    category: HelperCategory,
) -> Result<(), MatchError> {
    let session = state
        .sessions
        .get(session_id)
        .ok_or_else(|| MatchError::SessionNotFound(session_id.to_string()))?;
    let mut inner = session.inner.lock().await;

    let drawn = {
        let used = inner.used_helpers.entry(category).or_default();
        state.helpers.draw(category, used)
    };

    let message = match drawn {
        Some(content) => ServerMessage::HelperDelivered { category, content },
        None => {
            tracing::info!(session_id = %session_id, ?category, "Helper bank exhausted");
            ServerMessage::HelperUnavailable { category }
        }
    };
    broadcast_to_session(state, &inner, message);
    Ok(())
}

/// 라이브 세션이 없는 채로 남은 비종결 레코드를 유예 기간 후 종료 처리.
/// 프로세스 재시작 복구와 만료 저장 실패의 뒷정리를 겸한다
pub async fn sweep_stale_matches(state: &Arc<AppState>) {
    let cutoff = Utc::now() - ChronoDuration::seconds(state.config.sweep.grace_secs as i64);

    let stale = match state.store.stale_live_records(cutoff).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!(error = %e, "Stale match scan failed");
            return;
        }
    };

    let mut swept = 0;
    for record in stale {
        // 레지스트리에 세션이 살아 있으면 코디네이터 소관이다
        if state.sessions.get(&record.id).is_some() {
            continue;
        }

        let mut next = record;
        next.status = MatchStatus::Ended;
        next.ended_at = Some(Utc::now());
        match state.store.save(&next).await {
            Ok(()) => {
                swept += 1;
                tracing::info!(match_id = %next.id, "Stale match swept");
            }
            Err(e) => {
                tracing::error!(match_id = %next.id, error = %e, "Stale match sweep write failed");
            }
        }
    }

    if swept > 0 {
        tracing::info!(swept_matches = swept, "Sweep completed");
    }
}
