pub mod entity;
pub mod error;
pub mod repository;
pub mod service;
