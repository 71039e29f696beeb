pub mod asset_library;
pub mod combine;
pub mod label_file;
pub mod manifest;
pub mod output_layout;
pub mod run_config;
pub mod schedule;
