// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal CLI wrapper so the library can run as a stand-alone proxy.
//!
//!  Build it with `cargo build --release --bin esix`
//!  The binary honours ESIX_CONFIG_FILE or falls back to /etc/esix/config.toml.

use esix::Esix;
use esix::logging::log_info;
use std::env;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    println!("Starting Esix");

    // Prefer ESIX_CONFIG_FILE when present so the container user can
    // `docker run -v $(pwd)/config.toml:/etc/esix/config.toml ...`
    let file_from_env = env::var("ESIX_CONFIG_FILE").ok();

    // Base loader always pulls env vars; file path is optional.
    let mut loader = Esix::loader().with_env_vars();
    if let Some(ref path) = file_from_env {
        println!("Using configuration from {path}");
        loader = loader.with_config_file(path);
    } else {
        // Conventional default inside the image
        let fallback_path = "/etc/esix/config.toml";
        println!("No ESIX_CONFIG_FILE env var found. Attempting to use default configuration path: {fallback_path}");

        if !std::path::Path::new(fallback_path).exists() {
            println!("Default configuration file {fallback_path} does not exist.");
            return Err(Box::from("No configuration file found."));
        }

        loader = loader.with_config_file(fallback_path);
    }

    let proxy = match loader.build().await {
        Ok(p) => p,
        Err(e) => {
            println!("Failed to build proxy: {e}");
            return Err(e.into());
        }
    };

    match proxy.start().await {
        Ok(_) => {
            log_info("Esix", "Proxy server stopped gracefully");
        }
        Err(e) => {
            log_info("Esix", format!("Proxy server failed: {e}"));
            return Err(e.into());
        }
    }

    Ok(())
}
