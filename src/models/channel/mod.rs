pub mod api_channel;
pub mod db_channel;
