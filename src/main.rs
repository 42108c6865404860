fn main() {
    if let Err(err) = lola_lib::run() {
        eprintln!("lola: {err:#}");
        std::process::exit(1);
    }
}
