use std::{env, fs, path::PathBuf, process};

fn main() {
    let manifest_dir = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap_or_default());
    let config = manifest_dir.join("config").join("buttons.toml");
    println!("cargo:rerun-if-changed={}", config.display());

    let generated = match button_config_compiler::generate_from_path(&config) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {err}", config.display());
            process::exit(1);
        }
    };

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
    if let Err(err) = fs::write(out_dir.join("button_config.rs"), generated) {
        eprintln!("failed to write generated button config: {err}");
        process::exit(1);
    }
}
