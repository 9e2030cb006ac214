pub mod avi_format;
