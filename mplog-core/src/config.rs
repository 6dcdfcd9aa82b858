use std::sync::LazyLock;

use derive_from_env::FromEnv;

/// Identity given to a child by the orchestrator.
#[derive(FromEnv)]
#[from_env(prefix = "MPLOG")]
#[allow(non_snake_case)]
struct ProcessEnv {
    #[from_env(default = "main")]
    ROLE: String,
    #[from_env(default = "MainProcess")]
    PROCESS_NAME: String,
}

#[derive(FromEnv)]
#[from_env(prefix = "MPLOG")]
#[allow(non_snake_case)]
struct QueueEnv {
    #[from_env(default = "0")]
    QUEUE_CAPACITY: usize,
}

/// Process-level settings read once from `MPLOG_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(non_snake_case)]
pub struct MPLogConfig {
    /// `main`, `listener` or `worker`. Set by the orchestrator on its children.
    pub ROLE: String,
    pub PROCESS_NAME: String,
    /// Capacity of the orchestrator's record queue, 0 for unbounded.
    pub QUEUE_CAPACITY: usize,
}

impl Default for MPLogConfig {
    fn default() -> Self {
        Self {
            ROLE: "main".into(),
            PROCESS_NAME: "MainProcess".into(),
            QUEUE_CAPACITY: 0,
        }
    }
}

impl MPLogConfig {
    pub fn from_env() -> Self {
        Self::from_env_with_prefix("")
    }

    /// Reads `<prefix>_MPLOG_*`, or `MPLOG_*` for an empty prefix.
    ///
    /// The process identity and the queue settings are read separately: an
    /// unparsable queue setting falls back to its default and never resets
    /// the role a child was started with.
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        let defaults = Self::default();
        let process = ProcessEnv::from_env_with_prefix(prefix).unwrap_or_else(|err| {
            eprintln!("mplog: {err}, running as {:?}", defaults.ROLE);
            ProcessEnv {
                ROLE: defaults.ROLE,
                PROCESS_NAME: defaults.PROCESS_NAME,
            }
        });
        let queue = QueueEnv::from_env_with_prefix(prefix).unwrap_or_else(|err| {
            eprintln!("mplog: {err}, using an unbounded queue");
            QueueEnv {
                QUEUE_CAPACITY: defaults.QUEUE_CAPACITY,
            }
        });
        Self {
            ROLE: process.ROLE,
            PROCESS_NAME: process.PROCESS_NAME,
            QUEUE_CAPACITY: queue.QUEUE_CAPACITY,
        }
    }

    pub fn queue_capacity(&self) -> Option<usize> {
        (self.QUEUE_CAPACITY > 0).then_some(self.QUEUE_CAPACITY)
    }
}

pub static MPLOG_CONFIG: LazyLock<MPLogConfig> = LazyLock::new(MPLogConfig::from_env);
