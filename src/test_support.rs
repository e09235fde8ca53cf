use tokio::sync::{Mutex as AsyncMutex, MutexGuard};

/// Process-wide lock for tests that mutate environment variables.
static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());

/// Holds [`ENV_LOCK`] and unsets every variable it set when dropped.
pub struct ScopedEnv {
    keys: Vec<String>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    /// Blocks; call from sync tests only.
    pub fn lock() -> Self {
        Self {
            keys: Vec::new(),
            _lock: ENV_LOCK.blocking_lock(),
        }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        std::env::set_var(key, value);
        if !self.keys.iter().any(|k| k == key) {
            self.keys.push(key.to_string());
        }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}
