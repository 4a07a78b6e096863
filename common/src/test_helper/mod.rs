pub mod test_time_source;
