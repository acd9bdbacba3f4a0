use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(nsprune::cli::run().code())
}
