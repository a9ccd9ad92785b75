//! Per-acquisition ownership tokens

use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use uuid::Uuid;

static PROCESS_ID: LazyLock<String> = LazyLock::new(|| {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}:{}", host, std::process::id())
});

/// Value written into a lock key at acquisition.
///
/// Formatted as `<hostname>:<pid>:<uuid>` so a stuck lock can be traced back
/// to its holder. A fresh token is generated for every acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    pub fn generate() -> Self {
        Self(format!("{}:{}", *PROCESS_ID, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Display for LockToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = LockToken::generate();
        let b = LockToken::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_carries_process_id() {
        let token = LockToken::generate();
        let pid = std::process::id().to_string();
        let parts: Vec<&str> = token.as_str().rsplitn(3, ':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], pid);
        assert!(Uuid::parse_str(parts[0]).is_ok());
    }
}
