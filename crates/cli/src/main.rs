use std::process::ExitCode;

fn main() -> ExitCode {
    timeclerk_cli::run()
}
