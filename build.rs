fn main() {
    // intel_tex_2's prebuilt ISPC kernels reference the C++ runtime
    // (__gxx_personality_v0); link it explicitly so binaries link.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux") {
        println!("cargo:rustc-link-lib=stdc++");
    }
}
