pub mod db_log;
pub mod level;
pub mod log_entry;
