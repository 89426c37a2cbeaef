fn main() {
    if let Err(err) = datadash::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
