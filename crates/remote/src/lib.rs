pub mod error;
pub mod memory;
pub mod resource;
pub mod rest;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use resource::Resource;
pub use rest::RestClient;
pub use store::BudgetStore;
