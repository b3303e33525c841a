fn main() {
    if let Err(err) = grid_router::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
