pub mod classifier;

pub mod configuration;

pub mod error_handling;

pub mod storage;

pub mod realtime;

pub mod ingest;

pub mod web_interface;
