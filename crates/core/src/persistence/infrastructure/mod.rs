pub mod json_session_store;
pub mod memory_session_store;
