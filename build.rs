fn main() {
    // Host builds (tests, simulator) have no ESP-IDF environment to export.
    if std::env::var("CARGO_FEATURE_FIRMWARE").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
