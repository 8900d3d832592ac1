mod catalog;
mod db;
mod grading;
mod ipc;
mod notify;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    // The embedded catalog is validated at startup; a failure here is a
    // packaging bug, not a request-time condition.
    let initial_catalog = match catalog::Catalog::load_default() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("nazimd: invalid embedded rules config: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        catalog: initial_catalog,
        rules_from_workspace: false,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with a matching id; emit a bare error envelope.
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    ExitCode::SUCCESS
}
