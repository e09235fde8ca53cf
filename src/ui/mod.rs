pub mod input_metrics;
