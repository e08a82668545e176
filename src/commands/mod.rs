pub mod check_header;
pub mod process;

pub use check_header::{CheckHeaderArgs, handle_check_header};
pub use process::{ProcessArgs, handle_process};
