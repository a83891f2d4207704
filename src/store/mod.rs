pub mod memory;

pub use memory::MemoryAccount;
