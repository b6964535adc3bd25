mod send_lines;
mod socket;
mod stream;

// re-export
pub use send_lines::*;
pub use socket::{next_addr, wait_until_refused};
pub use stream::*;
