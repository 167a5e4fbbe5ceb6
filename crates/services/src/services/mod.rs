pub mod analytics;
pub mod claude_api;
pub mod clients;
pub mod delivery;
pub mod email_generator;
pub mod followups;
pub mod profiles;
