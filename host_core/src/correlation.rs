//! Table of outstanding host-to-Wox requests.
//!
//! Each outbound request reserves its id here before the frame is sent;
//! the dispatch engine completes the waiter when the matching response
//! arrives. Entries are removed atomically on completion so a waiter can
//! never fire twice. The lock is held only across lookup and insert.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use serde_json::Value;
use tokio::sync::oneshot;

type Waiter = oneshot::Sender<Result<Value, String>>;

static WAITING_FOR_RESPONSE: Lazy<Mutex<HashMap<String, Waiter>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Reserve `id` and hand back the receiving end of its one-shot completion.
pub fn register(id: &str) -> oneshot::Receiver<Result<Value, String>> {
    let (tx, rx) = oneshot::channel();
    let mut waiting = WAITING_FOR_RESPONSE.lock().unwrap();
    waiting.insert(id.to_string(), tx);
    rx
}

/// Complete and remove the waiter for `id`. Returns false when no waiter
/// is registered, so the caller can log and drop the frame.
pub fn complete(id: &str, outcome: Result<Value, String>) -> bool {
    let waiter = {
        let mut waiting = WAITING_FOR_RESPONSE.lock().unwrap();
        waiting.remove(id)
    };
    match waiter {
        Some(tx) => {
            // The waiter may have been dropped by a failed send; either way
            // the entry is gone.
            let _ = tx.send(outcome);
            true
        }
        None => false,
    }
}

/// Drop the waiter for `id` without completing it. Used when the request
/// frame could not be sent.
pub fn remove(id: &str) {
    let mut waiting = WAITING_FOR_RESPONSE.lock().unwrap();
    waiting.remove(id);
}

/// Number of outstanding requests.
pub fn pending() -> usize {
    WAITING_FOR_RESPONSE.lock().unwrap().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiter_resolves_with_its_own_outcome() {
        let rx = register("q1");
        assert!(complete("q1", Ok(Value::String("value".into()))));
        assert_eq!(rx.await.unwrap().unwrap(), Value::String("value".into()));
        assert_eq!(pending(), 0);
    }

    #[tokio::test]
    async fn completion_removes_the_entry() {
        let _rx = register("q2");
        assert!(complete("q2", Ok(Value::Null)));
        assert!(!complete("q2", Ok(Value::Null)));
    }

    #[test]
    fn unknown_id_reports_false() {
        assert!(!complete("never-registered", Err("boom".into())));
    }
}
