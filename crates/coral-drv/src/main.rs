fn main() {
    if let Err(err) = coral_drv::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
