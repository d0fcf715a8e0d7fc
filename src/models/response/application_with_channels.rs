use crate::models::{application::api_application::Application, channel::api_channel::Channel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApplicationWithChannels {
    #[serde(flatten)]
    pub application: Application,
    pub channels: Vec<Channel>,
}
