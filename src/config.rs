use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "/dfas";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Identifies the named OS resources of one run and how long blocking waits may last before the
/// waiting process re-checks its termination flags.
///
/// Supervisor and generators of the same run have to agree on the namespace. A second run with
/// the same namespace collides with a run whose resources have not been removed yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    pub namespace: String,
    pub poll_interval: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ChannelConfig {
    pub fn new<S: Into<String>>(namespace: S, poll_interval: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            poll_interval,
        }
    }

    /// Name of the shared memory segment holding the ring buffer
    pub fn ring_name(&self) -> String {
        self.resource_name("ring")
    }

    /// Name of the semaphore counting free slots
    pub fn free_name(&self) -> String {
        self.resource_name("free")
    }

    /// Name of the semaphore counting used slots
    pub fn used_name(&self) -> String {
        self.resource_name("used")
    }

    /// Name of the semaphore serializing writers
    pub fn mutex_name(&self) -> String {
        self.resource_name("excl")
    }

    fn resource_name(&self, suffix: &str) -> String {
        if self.namespace.starts_with('/') {
            format!("{}_{}", self.namespace, suffix)
        } else {
            format!("/{}_{}", self.namespace, suffix)
        }
    }
}
