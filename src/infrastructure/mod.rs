//! Storage and messaging adapters
pub mod events;
pub mod memory;
pub mod postgres;
pub mod store;

pub use events::EventPublisher;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use store::{MarketplaceStore, Page, RepoError, RepoResult, UnitOfWork};
