use std::io::Write;

use clap::Parser;

use cligui::{
    cli::{run, Cli},
    error::classify_error_code,
};

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            let stderr = std::io::stderr();
            let mut handle = stderr.lock();
            let code = classify_error_code(&error);
            let _ = handle.write_all(format!("error[{code}]: {error}\n").as_bytes());
            let _ = handle.flush();
            std::process::exit(1);
        }
    }
}
