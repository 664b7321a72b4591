pub mod config;
pub mod io;
pub mod logging;
pub mod schedule;
pub mod sync;
pub mod time_util;
