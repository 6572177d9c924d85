pub mod chat;
pub mod identify;
pub mod utils;
