use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{Result, bail};
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use brewers_db::Database;
use brewers_db::models::NewUser;

use crate::auth::{AppState, AppStateInner, create_token, hash_password};
use crate::mailer::{Mailer, OutgoingMail};
use crate::routes::router;

pub const TEST_PASSWORD: &str = "password123";

/// Argon2 is slow; every seeded user shares one hash.
fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).unwrap())
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: OutgoingMail) -> BoxFuture<'_, Result<()>> {
        async move {
            if self.fail {
                bail!("connection refused");
            }
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
        .boxed()
    }
}

pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mailer(RecordingMailer::default())
    }

    pub fn with_failing_mail() -> Self {
        Self::with_mailer(RecordingMailer::failing())
    }

    fn with_mailer(mailer: RecordingMailer) -> Self {
        let mailer = Arc::new(mailer);
        let state: AppState = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-jwt-secret".into(),
            token_secret: b"test-token-secret".to_vec(),
            base_url: "http://brewers.test".into(),
            mailer: mailer.clone(),
        });

        Self {
            router: router(state.clone()),
            state,
            mailer,
        }
    }

    /// Sends one request through the router. Non-JSON bodies come back as a
    /// JSON string, empty bodies as null.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Inserts a user straight into the database, with email
    /// `<username>@example.com` and password `TEST_PASSWORD`.
    pub async fn seed_user(&self, username: &str) -> TestUser {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let email = format!("{username}@example.com");
        let name = username.to_string();

        self.state
            .run_db(move |db| {
                db.create_user(&NewUser {
                    id: &id_str,
                    username: &name,
                    email: &email,
                    password_hash: test_password_hash(),
                    first_name: "",
                    last_name: "",
                    city: None,
                    state: None,
                    zip: None,
                })
            })
            .await
            .unwrap();

        TestUser {
            id,
            token: create_token(&self.state.jwt_secret, id, username).unwrap(),
        }
    }

    pub async fn seed_batch(&self, owner: &TestUser, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let owner_id = owner.id.to_string();
        let name = name.to_string();

        self.state
            .run_db(move |db| db.create_batch(&id_str, &owner_id, &name, "Mead"))
            .await
            .unwrap();
        id
    }
}
