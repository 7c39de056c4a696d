// handlers/public/mod.rs - Public handlers (no token required)
//
// Landing, health and token acquisition. Everything else lives under
// `protected` and resolves a `Subject` before touching the store.

pub mod home;
pub mod login;
