fn main() {
    // ESP-IDF sysenv propagation only matters for device builds; host-side
    // test builds have no espidf environment to forward.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
