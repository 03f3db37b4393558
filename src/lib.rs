// Library for tests to access modules

pub mod aggregator;
pub mod config;
pub mod feed_client;
pub mod models;
pub mod routes;
pub mod service;
pub mod version;
pub mod worker;
