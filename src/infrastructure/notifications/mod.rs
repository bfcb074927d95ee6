pub mod composite;
pub mod outbox;
pub mod terminal;
