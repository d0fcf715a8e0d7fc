pub mod application_with_channels;
pub mod channel_with_logs;
