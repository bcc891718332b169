pub mod class_catalog;
pub mod scanner_config;
