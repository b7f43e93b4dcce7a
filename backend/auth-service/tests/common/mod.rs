//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};

use auth_service::clock::ManualClock;
use auth_service::db::MemoryStore;
use auth_service::models::{City, Gender};
use auth_service::security::{Argon2Hasher, CredentialCodec};
use auth_service::services::{AuthCore, VerificationNotifier};
use auth_service::Result;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

/// Captures every code the core tries to deliver
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Most recent OTP sent to `email`
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, otp)| otp.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl VerificationNotifier for RecordingNotifier {
    async fn send_verification_code(&self, recipient: &str, otp: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), otp.to_string()));
        Ok(())
    }
}

pub struct World {
    pub core: Arc<AuthCore>,
    pub store: Arc<MemoryStore>,
    pub clock: ManualClock,
    pub notifier: Arc<RecordingNotifier>,
}

fn city(id: i32, code: &str, name: &str, kind: &str, province: Option<&str>) -> City {
    City {
        id,
        code: code.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        province_code: province.map(str::to_string),
        parent_code: province.map(str::to_string),
    }
}

pub async fn world() -> World {
    let store = Arc::new(MemoryStore::new());

    store.add_city(city(1, "01", "Ha Noi", "province", None)).await;
    store.add_city(city(2, "79", "Ho Chi Minh", "province", None)).await;
    store
        .add_city(city(10, "00004", "Ba Dinh", "ward", Some("01")))
        .await;
    store
        .add_city(city(11, "00001", "Hoan Kiem", "ward", Some("01")))
        .await;
    store
        .add_city(city(20, "26734", "Ben Nghe", "ward", Some("79")))
        .await;
    for (id, name) in [(1, "male"), (2, "female"), (3, "other")] {
        store
            .add_gender(Gender {
                id,
                name: name.to_string(),
            })
            .await;
    }

    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
    let notifier = Arc::new(RecordingNotifier::default());
    let hasher = Argon2Hasher::with_params(1024, 1, 1).unwrap();

    let core = AuthCore::new(
        store.clone(),
        CredentialCodec::new(TEST_SECRET),
        Arc::new(hasher),
        notifier.clone(),
        Arc::new(clock.clone()),
    )
    .unwrap();

    World {
        core: Arc::new(core),
        store,
        clock,
        notifier,
    }
}
