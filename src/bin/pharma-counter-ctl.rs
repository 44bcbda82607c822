use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process;

fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join("pharma-counter.sock")
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
        process::exit(1);
    }

    let cmd = args.join(" ");
    match cmd.as_str() {
        "toggle" | "call-next" | "validate" | "pause" | "recall" | "logout"
        | "test-notification" | "theme dark" | "theme light" => {}
        _ if cmd.starts_with("login ") && cmd.len() > 6 => {}
        _ => {
            eprintln!("unknown command: {cmd}");
            usage();
            process::exit(1);
        }
    }

    let path = socket_path();
    let mut stream = match UnixStream::connect(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("pharma-counter not running ({path:?}): {e}");
            process::exit(1);
        }
    };

    if let Err(e) = writeln!(stream, "{cmd}") {
        eprintln!("failed to send command: {e}");
        process::exit(1);
    }
}

fn usage() {
    eprintln!("usage: pharma-counter-ctl <command>");
    eprintln!();
    eprintln!("commands:");
    eprintln!("  toggle             toggle the counter panel");
    eprintln!("  call-next          validate the current patient and call the next one");
    eprintln!("  validate           validate the current patient");
    eprintln!("  pause              put the current patient back in the waiting pool");
    eprintln!("  recall             re-announce the current patient");
    eprintln!("  login <initials>   log staff in at this counter");
    eprintln!("  logout             release the counter's staff binding");
    eprintln!("  test-notification  show a test toast");
    eprintln!("  theme dark|light   switch the panel theme");
}
