pub mod body_scanner;
pub mod report;
pub mod view;
