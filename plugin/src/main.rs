use std::process::ExitCode;

fn main() -> ExitCode {
    webquery_lib::run()
}
