fn main() {
    // embuild is only needed for Xtensa builds of the firmware image.
    // Host builds (tests, simulator) skip the ESP-IDF environment entirely.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.contains("xtensa") || target.ends_with("-espidf") {
        embuild::espidf::sysenv::output();
    }
}
