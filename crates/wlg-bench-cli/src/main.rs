#![forbid(unsafe_code)]

fn main() {
    std::process::exit(wlg_bench_cli::run());
}
