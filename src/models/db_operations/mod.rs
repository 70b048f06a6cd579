pub mod analytics_db_operations;
pub mod posts_db_operations;
pub mod users_db_operations;
pub mod widgets_db_operations;
