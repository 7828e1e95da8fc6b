pub mod console_notifier;
pub mod fake_eligibility;
pub mod frontdesk_client;
pub mod memory_store;
pub mod multi_notifier;
pub mod slack_notifier;
pub mod sqlite_store;
