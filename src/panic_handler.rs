use std::io::{self, Write};
use std::panic;

/// Install pretty backtraces and make sure buffered log output reaches the
/// log file before the process dies
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("Panic: {panic_info}");
        log::logger().flush();

        default_hook(panic_info);
        let _ = writeln!(io::stderr());

        std::process::exit(1);
    }));
}
