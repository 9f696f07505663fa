pub mod request_reader;
pub mod seed;
