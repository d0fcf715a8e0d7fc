pub mod api_application;
pub mod db_application;
