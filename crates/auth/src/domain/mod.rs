pub mod entity;
pub mod events;
pub mod notifier;
pub mod repository;
pub mod value_object;
