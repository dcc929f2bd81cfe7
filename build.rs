fn main() {
    // Only firmware builds need the ESP-IDF environment; host tests skip it.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
