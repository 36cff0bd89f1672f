fn main() {
    // The opencv crate needs libclang to generate bindings. On macOS the
    // CommandLineTools copy is not on the default search path.
    #[cfg(target_os = "macos")]
    {
        let clt = "/Library/Developer/CommandLineTools/usr/lib";
        if std::path::Path::new(clt).exists() {
            std::env::set_var("LIBCLANG_PATH", clt);
            std::env::set_var("DYLD_FALLBACK_LIBRARY_PATH", clt);
        }
    }

    println!("cargo:rerun-if-changed=build.rs");
}
