//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "leadgate".to_string()
}

pub fn default_data_dir() -> String {
    "./data".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8088
}

pub fn default_db_path() -> String {
    "./data/leadgate.db".to_string()
}

pub fn default_kv_backend() -> String {
    "redis".to_string()
}

pub fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

pub fn default_lock_ttl() -> u64 {
    10
}

pub fn default_cooldown_ttl() -> u64 {
    2
}

pub fn default_idempotency_ttl() -> u64 {
    86_400
}

pub fn default_max_warnings() -> i64 {
    3
}

pub fn default_lock_attempts() -> u32 {
    3
}

pub fn default_job_poll_interval() -> u64 {
    2
}

pub fn default_spreadsheet_attempts() -> u32 {
    5
}

pub fn default_notify_attempts() -> u32 {
    3
}
