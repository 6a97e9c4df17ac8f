use std::process::ExitCode;

fn main() -> ExitCode {
    querystream_cli::run()
}
