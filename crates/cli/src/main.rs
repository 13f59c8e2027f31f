use std::process::ExitCode;

fn main() -> ExitCode {
    moxbot_cli::run()
}
