pub mod capture_provider;
pub mod clock;
pub mod media_writer;
pub mod sample_reader;
