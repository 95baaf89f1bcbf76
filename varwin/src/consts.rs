pub const VARWIN_CMD: &str = "varwin";
pub const VERSION: &str = "0.1.0";

pub const DEFAULT_WINDOW_LENGTH: u64 = 100;
pub const DEFAULT_WINDOW_COUNT: u64 = 1_000_000;
pub const DEFAULT_AF_THRESHOLD: f64 = 0.5;

pub const DEFAULT_THREAD_COUNT: usize = 4;

pub fn get_thread_count(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_THREAD_COUNT)
}
