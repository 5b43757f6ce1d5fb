pub mod api;
pub mod backend;
pub mod chat;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod notifications;
pub mod poll;
pub mod session;
pub mod stats;
pub mod storage;
pub mod store;
pub mod whatsapp;
