pub mod dto;
pub mod handlers;
pub mod server;

pub use server::{router, serve};
