use std::env;
use std::path::Path;

fn main() {
    let target = env::var("TARGET").unwrap_or_default();

    if target.contains("windows") {
        let mut res = winres::WindowsResource::new();

        if Path::new("resources/icon.ico").exists() {
            res.set_icon("resources/icon.ico");
        }

        res.set("FileDescription", "Flipbook");
        res.set("ProductName", "Flipbook");
        res.set("FileVersion", env!("CARGO_PKG_VERSION"));
        res.set("ProductVersion", env!("CARGO_PKG_VERSION"));

        if let Err(e) = res.compile() {
            println!("cargo:warning=failed to embed Windows resources: {e}");
        }
    }
}
