//! Generates Swift and Kotlin bindings for the `biokey` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
