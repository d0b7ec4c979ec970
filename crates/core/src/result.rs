//! Terminal results delivered by asynchronous tasks.

use serde::{Deserialize, Serialize};

/// The three terminal outcomes of an asynchronous task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AsyncResult<T> {
    /// Completed with a value
    Success(T),
    /// Failed with a message
    Fail(String),
    /// Gave up waiting
    Timeout(String),
}

impl<T> AsyncResult<T> {
    /// Whether this is a `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, AsyncResult::Success(_))
    }

    /// Map the success value, keeping failures as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> AsyncResult<U> {
        match self {
            AsyncResult::Success(v) => AsyncResult::Success(f(v)),
            AsyncResult::Fail(m) => AsyncResult::Fail(m),
            AsyncResult::Timeout(m) => AsyncResult::Timeout(m),
        }
    }

    /// Borrow the success value, if any.
    pub fn success(&self) -> Option<&T> {
        match self {
            AsyncResult::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Convert into a `Result`, with the failure or timeout message as the error.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            AsyncResult::Success(v) => Ok(v),
            AsyncResult::Fail(m) => Err(m),
            AsyncResult::Timeout(m) => Err(format!("timeout: {m}")),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for AsyncResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => AsyncResult::Success(v),
            Err(e) => AsyncResult::Fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_failures() {
        let ok: AsyncResult<i32> = AsyncResult::Success(3);
        assert_eq!(ok.map(|v| v * 2), AsyncResult::Success(6));

        let failed: AsyncResult<i32> = AsyncResult::Fail("boom".to_string());
        assert_eq!(failed.map(|v| v * 2), AsyncResult::Fail("boom".to_string()));
    }

    #[test]
    fn test_from_result() {
        let r: Result<i32, std::io::Error> = Err(std::io::Error::other("disk"));
        assert_eq!(AsyncResult::from(r), AsyncResult::Fail("disk".to_string()));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(AsyncResult::Success(100)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "success", "value": 100}));

        let back: AsyncResult<i32> =
            serde_json::from_value(serde_json::json!({"type": "timeout", "value": "slow"})).unwrap();
        assert_eq!(back, AsyncResult::Timeout("slow".to_string()));
    }
}
