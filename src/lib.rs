pub mod aggregate;
pub mod charts;
pub mod cohort;
pub mod color;
pub mod config;
pub mod config_file;
pub mod context;
pub mod crossing;
pub mod distribution;
pub mod join;
pub mod load;
pub mod output_table;
pub mod record;
pub mod render;
pub mod summary;
pub mod utillib;
