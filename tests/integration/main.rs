mod agent_test;
mod config_test;
mod lifecycle_test;
