use std::process::ExitCode;

fn main() -> ExitCode {
    costcalc_cli::run()
}
