//! FlashMeet 실시간 매치 세션 코디네이터 서버

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use flashmeet_match_rs::config::Config;
use flashmeet_match_rs::directory::MemoryDirectory;
use flashmeet_match_rs::handlers;
use flashmeet_match_rs::protocol::{ClientMessage, ServerMessage};
use flashmeet_match_rs::session::coordinator;
use flashmeet_match_rs::state::AppState;
use flashmeet_match_rs::store::MemoryMatchStore;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 저장소와 디렉터리는 외부 협력 서비스 자리. 단일 프로세스 배포는
    // 인메모리 구현으로 배선한다
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(MemoryMatchStore::new()),
        Arc::new(MemoryDirectory::new()),
    ));

    // 비종결 매치 레코드 정리 스케줄러
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
            sweep_state.config.sweep.interval_secs,
        ));
        loop {
            interval.tick().await;
            coordinator::sweep_stale_matches(&sweep_state).await;
        }
    });

    // CORS 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/match/find", post(handlers::matchmaking::find_match))
        .route(
            "/api/match/active",
            get(handlers::matchmaking::active_match),
        )
        .layer(cors)
        .with_state(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 FlashMeet Match Coordinator started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>FlashMeet Match Coordinator</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "flashmeet-match-rs",
        "timestamp": std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let channel_id = Uuid::new_v4().to_string();
    let _ = tx.send(ServerMessage::Connected {
        channel_id: channel_id.clone(),
    });
    tracing::info!(channel_id = %channel_id, "New connection established");

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    // 이 채널로 신원을 밝힌 사용자
    let mut current_user: Option<String> = None;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    handle_client_message(&state, &channel_id, &mut current_user, &tx, msg).await;
                }
                Err(e) => {
                    // 해석 불가/잘못된 값은 보낸 쪽에만 알린다
                    let _ = tx.send(ServerMessage::Error {
                        code: "PRECONDITION".to_string(),
                        message: format!("malformed message: {}", e),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, &channel_id, current_user.as_deref()).await;
    send_task.abort();
}

async fn handle_client_message(
    state: &Arc<AppState>,
    channel_id: &str,
    current_user: &mut Option<String>,
    sender: &mpsc::UnboundedSender<ServerMessage>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::Heartbeat => {
            handlers::handle_heartbeat(sender);
        }
        ClientMessage::PresenceOnline { user_id } => {
            handlers::handle_presence_online(state, channel_id, sender, &user_id).await;
            *current_user = Some(user_id);
        }
        ClientMessage::SessionJoin {
            session_id,
            user_id,
        } => {
            handlers::handle_session_join(state, sender, &user_id, &session_id).await;
        }
        ClientMessage::SessionLeave { session_id } => {
            if let Some(user_id) = current_user.as_deref() {
                handlers::handle_session_leave(state, user_id, &session_id).await;
            }
        }
        ClientMessage::DecisionSubmit {
            session_id,
            user_id,
            decision,
        } => {
            handlers::handle_decision_submit(state, sender, &user_id, &session_id, decision).await;
        }
        ClientMessage::SessionSkip {
            session_id,
            user_id,
        } => {
            handlers::handle_session_skip(state, sender, &user_id, &session_id).await;
        }
        ClientMessage::HelperRequest {
            session_id,
            category,
        } => {
            handlers::handle_helper_request(state, sender, &session_id, category).await;
        }
        ClientMessage::Offer {
            to_user_id,
            payload,
        } => match current_user.as_deref() {
            Some(from) => handlers::handle_offer(state, from, &to_user_id, payload).await,
            None => identify_required(sender),
        },
        ClientMessage::Answer {
            to_user_id,
            payload,
        } => match current_user.as_deref() {
            Some(from) => handlers::handle_answer(state, from, &to_user_id, payload).await,
            None => identify_required(sender),
        },
        ClientMessage::IceCandidate {
            to_user_id,
            payload,
        } => match current_user.as_deref() {
            Some(from) => handlers::handle_ice_candidate(state, from, &to_user_id, payload).await,
            None => identify_required(sender),
        },
    }
}

/// 시그널링은 발신자 신원이 먼저 바인딩되어 있어야 한다
fn identify_required(sender: &mpsc::UnboundedSender<ServerMessage>) {
    let _ = sender.send(ServerMessage::Error {
        code: "PRECONDITION".to_string(),
        message: "identify with PresenceOnline first".to_string(),
    });
}
