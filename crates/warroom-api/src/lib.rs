pub mod auth;
pub mod chat;
pub mod contact;
pub mod context;
pub mod error;
pub mod files;
pub mod middleware;
pub mod router;
pub mod session;
pub mod trigger;
