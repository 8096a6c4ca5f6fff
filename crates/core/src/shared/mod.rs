pub mod constants;
pub mod emotion;
pub mod frame;
