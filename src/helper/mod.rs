pub mod analytics_helpers;
pub mod classify_helpers;
pub mod publish_helpers;
pub mod sanitization_helpers;
pub mod shortcode_helpers;
pub mod slug_helpers;
pub mod throttle_helpers;
