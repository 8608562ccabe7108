//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the JSON API listens on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("LEADBOX_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Self { port }
    }
}

/// Mailbox sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How many recent threads one sync run pulls.
    pub page_size: u32,
    /// Scheduler interval between sync sweeps. 0 disables the scheduler.
    pub poll_interval_secs: u64,
    /// Deadline for a single connection sync run.
    pub run_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            poll_interval_secs: 300,
            run_timeout_secs: 120,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let page_size: u32 = std::env::var("LEADBOX_SYNC_PAGE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.page_size);

        let poll_interval_secs: u64 = std::env::var("LEADBOX_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.poll_interval_secs);

        let run_timeout_secs: u64 = std::env::var("LEADBOX_SYNC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.run_timeout_secs);

        Self {
            page_size,
            poll_interval_secs,
            run_timeout_secs,
        }
    }

    /// Whether the background scheduler should run at all.
    pub fn scheduler_enabled(&self) -> bool {
        self.poll_interval_secs > 0
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Optional mailbox connection seeded from the environment.
///
/// The OAuth flow that normally writes connection rows lives outside this
/// service, so a fresh deployment can point the sync at one mailbox by
/// exporting `LEADBOX_SEED_MAILBOX` and `LEADBOX_SEED_ACCESS_TOKEN`.
#[derive(Debug, Clone)]
pub struct SeedConnection {
    pub user_id: String,
    pub mailbox_email: String,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
}

impl SeedConnection {
    pub fn from_env() -> Option<Self> {
        let mailbox_email = std::env::var("LEADBOX_SEED_MAILBOX").ok()?;
        let access_token = std::env::var("LEADBOX_SEED_ACCESS_TOKEN").ok()?;

        let user_id =
            std::env::var("LEADBOX_SEED_USER_ID").unwrap_or_else(|_| "default".to_string());

        let refresh_token = std::env::var("LEADBOX_SEED_REFRESH_TOKEN")
            .ok()
            .map(SecretString::from);

        Some(Self {
            user_id,
            mailbox_email,
            access_token: SecretString::from(access_token),
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.poll_interval_secs, 300);
        assert!(config.scheduler_enabled());
        assert_eq!(config.run_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn zero_interval_disables_scheduler() {
        let config = SyncConfig {
            poll_interval_secs: 0,
            ..SyncConfig::default()
        };
        assert!(!config.scheduler_enabled());
    }

    #[test]
    fn seed_connection_requires_mailbox_and_token() {
        // SAFETY: This test runs in isolation; no other thread reads these vars concurrently.
        unsafe {
            std::env::remove_var("LEADBOX_SEED_MAILBOX");
            std::env::remove_var("LEADBOX_SEED_ACCESS_TOKEN");
        }
        assert!(SeedConnection::from_env().is_none());
    }
}
