use crate::models::{
    application::api_application::Application, channel::api_channel::Channel, log::log_entry::LogEntry,
};
use serde::Serialize;

/// Channel detail view: metadata, owner, and the most recent entries.
#[derive(Debug, Serialize)]
pub struct ChannelWithLogs {
    pub channel: Channel,
    pub application: Application,
    pub logs: Vec<LogEntry>,
}
