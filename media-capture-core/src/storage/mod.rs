pub mod avi_writer;
pub mod checksum;
