use chrono::{Local, Utc};

pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

pub fn now_local_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
