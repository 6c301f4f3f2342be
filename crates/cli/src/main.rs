use std::process::ExitCode;

fn main() -> ExitCode {
    replybot_cli::run()
}
