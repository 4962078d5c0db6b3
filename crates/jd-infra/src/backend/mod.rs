mod fixture;
mod memory;

pub use fixture::load_fixture;
pub use memory::InMemoryJobBackend;
