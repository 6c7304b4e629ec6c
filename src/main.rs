//! VigilKV CLI entry point
//!
//! main.rs only parses arguments and dispatches; it never calls
//! subsystems directly.

use std::process;

use vigilkv::cli::{run_command, Cli};

fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.command) {
        // Print error JSON and exit non-zero
        let error_json = serde_json::json!({
            "status": "error",
            "code": e.code_str(),
            "message": e.message()
        });

        eprintln!("{}", error_json);
        process::exit(1);
    }
}
