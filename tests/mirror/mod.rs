mod config_file_test;
mod offline_test;
mod online_test;
