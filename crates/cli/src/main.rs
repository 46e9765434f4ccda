use std::process::ExitCode;

fn main() -> ExitCode {
    teleassist_cli::run()
}
