//! Adds the VideoCore userland library directory to the link search path
//! when the `videocore` feature is enabled.

fn main() {
    println!("cargo:rerun-if-env-changed=VC_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_VIDEOCORE").is_some() {
        let dir = std::env::var("VC_LIB_DIR").unwrap_or_else(|_| "/opt/vc/lib".to_string());
        println!("cargo:rustc-link-search=native={dir}");
    }
}
