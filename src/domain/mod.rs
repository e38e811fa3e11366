pub mod codes;
pub mod entities;
pub mod slug;
pub mod types;
