use hostprep::cli::{exit_code_for, format_error_chain, run};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", format_error_chain(&e));
        std::process::exit(exit_code_for(&e));
    }
}
