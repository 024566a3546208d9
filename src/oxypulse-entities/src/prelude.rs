pub use super::sessions::Entity as Sessions;
pub use super::settings::Entity as Settings;
