pub mod auth;
pub mod bootstrap;
pub mod chat;
pub mod controller;
pub mod recording;
