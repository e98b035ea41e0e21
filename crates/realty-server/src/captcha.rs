//! Registration captchas held in memory.
//!
//! Each challenge is answerable once. A challenge is consumed by the first
//! verification attempt whether or not the answer matches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::Mutex;
use uuid::Uuid;

use realty_shared::constants::{CAPTCHA_ALPHABET, CAPTCHA_LEN};

#[derive(Debug, Clone)]
struct Challenge {
    answer: String,
    issued_at: Instant,
}

#[derive(Clone)]
pub struct CaptchaStore {
    challenges: Arc<Mutex<HashMap<Uuid, Challenge>>>,
    ttl: Duration,
}

impl CaptchaStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            challenges: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Issue a new challenge. Returns the token and the text to show.
    pub async fn issue(&self) -> (Uuid, String) {
        let token = Uuid::new_v4();
        let text = generate_text();
        self.challenges.lock().await.insert(
            token,
            Challenge {
                answer: text.clone(),
                issued_at: Instant::now(),
            },
        );
        (token, text)
    }

    /// Check `answer` against the challenge and consume it.
    ///
    /// Comparison ignores case and surrounding whitespace.
    pub async fn verify(&self, token: Uuid, answer: &str) -> bool {
        let Some(challenge) = self.challenges.lock().await.remove(&token) else {
            return false;
        };
        if challenge.issued_at.elapsed() > self.ttl {
            return false;
        }
        challenge.answer.eq_ignore_ascii_case(answer.trim())
    }

    /// Drop challenges older than the TTL.
    pub async fn purge_expired(&self) -> usize {
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        challenges.retain(|_, c| c.issued_at.elapsed() <= self.ttl);
        before - challenges.len()
    }

    pub async fn pending(&self) -> usize {
        self.challenges.lock().await.len()
    }
}

fn generate_text() -> String {
    let mut rng = rand::thread_rng();
    (0..CAPTCHA_LEN)
        .map(|_| CAPTCHA_ALPHABET[rng.gen_range(0..CAPTCHA_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_and_verify_once() {
        let store = CaptchaStore::new(Duration::from_secs(60));
        let (token, text) = store.issue().await;

        assert_eq!(text.len(), CAPTCHA_LEN);
        assert!(text.bytes().all(|b| CAPTCHA_ALPHABET.contains(&b)));

        let answer = format!("  {}  ", text.to_lowercase());
        assert!(store.verify(token, &answer).await);
        assert!(!store.verify(token, &text).await);
    }

    #[tokio::test]
    async fn test_wrong_answer_consumes_challenge() {
        let store = CaptchaStore::new(Duration::from_secs(60));
        let (token, text) = store.issue().await;

        assert!(!store.verify(token, "nope").await);
        assert!(!store.verify(token, &text).await);
        assert!(!store.verify(Uuid::new_v4(), &text).await);
    }

    #[tokio::test]
    async fn test_expired_challenges() {
        let store = CaptchaStore::new(Duration::ZERO);
        let (token, text) = store.issue().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!store.verify(token, &text).await);

        store.issue().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.pending().await, 0);
    }
}
