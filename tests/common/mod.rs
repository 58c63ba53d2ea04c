//! Shared harness: a relay served on an ephemeral port with in-memory
//! backends, plus token and socket helpers.

#![allow(dead_code, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use robot_relay::access::{AccessOracle, StaticAccessOracle};
use robot_relay::app_state::AppState;
use robot_relay::auth::JwtIdentity;
use robot_relay::auth::jwt::Claims;
use robot_relay::build_app;
use robot_relay::domain::{EventBus, EventRecord, GroupRegistry, Principal, RobotId};
use robot_relay::persistence::{EventLogStore, InMemoryEventLog};
use robot_relay::service::RelayService;

pub const SECRET: &str = "integration-test-secret";

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub log: Arc<InMemoryEventLog>,
    pub oracle: Arc<StaticAccessOracle>,
    pub logged: broadcast::Receiver<EventRecord>,
}

impl TestServer {
    pub async fn start() -> Self {
        let log = Arc::new(InMemoryEventLog::new(1024));
        let oracle = Arc::new(StaticAccessOracle::new());
        let (bus, _sink) = EventBus::spawn(1024, Arc::clone(&log) as Arc<dyn EventLogStore>);
        let logged = bus.subscribe();
        let relay = Arc::new(RelayService::new(
            Arc::new(GroupRegistry::new()),
            bus,
            Arc::clone(&oracle) as Arc<dyn AccessOracle>,
        ));
        let state = AppState {
            relay,
            identity: Arc::new(JwtIdentity::new(SECRET)),
            session_outbound_capacity: 64,
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let app = build_app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        Self {
            addr,
            state,
            log,
            oracle,
            logged,
        }
    }

    /// A user that owns a freshly created robot.
    pub fn owner(&self, username: &str) -> (Principal, RobotId) {
        let principal = Principal::new(Uuid::new_v4(), username);
        let robot = RobotId::new();
        self.oracle.grant(principal.user_id, robot);
        (principal, robot)
    }

    pub fn ws_url(&self, robot: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!("ws://{}/ws/robot/{robot}?token={token}", self.addr),
            None => format!("ws://{}/ws/robot/{robot}", self.addr),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn member_count(&self, robot: RobotId) -> usize {
        self.state.relay.registry().member_count(robot)
    }

    /// Opens a session and consumes its `connection_established` frame.
    pub async fn connect(&self, principal: &Principal, robot: RobotId) -> Client {
        let url = self.ws_url(&robot.to_string(), Some(&token_for(principal)));
        let (mut client, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("handshake accepted");
        let first = next_json(&mut client).await;
        assert_eq!(first["type"], "connection_established");
        client
    }

    pub async fn next_record(&mut self) -> EventRecord {
        match tokio::time::timeout(Duration::from_secs(2), self.logged.recv()).await {
            Ok(Ok(record)) => record,
            other => panic!("no record logged: {other:?}"),
        }
    }
}

pub fn token_for(principal: &Principal) -> String {
    let claims = Claims {
        sub: principal.user_id,
        username: principal.username.clone(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// Next text frame as JSON, failing after two seconds.
pub async fn next_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("server sends JSON");
        }
    }
}

/// Asserts that no text frame arrives within `window`.
pub async fn assert_silent(client: &mut Client, window: Duration) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(window, client.next()).await {
        panic!("unexpected frame: {text}");
    }
}

pub async fn send_text(client: &mut Client, text: &str) {
    client
        .send(Message::text(text.to_string()))
        .await
        .expect("send frame");
}

pub async fn send_json(client: &mut Client, value: &Value) {
    send_text(client, &value.to_string()).await;
}

pub fn chat(text: &str) -> Value {
    serde_json::json!({"type": "chat_message_to_robot", "payload": {"text": text}})
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
