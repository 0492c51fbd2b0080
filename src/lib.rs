pub mod bandwidth;
pub mod capture;
pub mod config_file;
pub mod date_and_time;
pub mod distance;
pub mod get_terminal_width;
pub mod gps;
pub mod icmp;
pub mod io_utils;
pub mod join;
pub mod run;
pub mod table;
pub mod utillib;
