// SPDX-License-Identifier: MPL-2.0

use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    match nanobrew::cli::process() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("nanobrew: {err}");
            ExitCode::FAILURE
        }
    }
}
