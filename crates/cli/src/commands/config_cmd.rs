//! `searchhop --print-config` — show where the config lives and what it holds.

use searchhop_config::AppConfig;

pub fn print_default() {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("# Save as {}", config_path.display());
    println!("# API keys can also come from the environment or a .env file:");
    println!("#   GEMINI_API_KEY, TAVILY_API_KEY");
    println!();
    println!("{}", AppConfig::default_toml());
}

#[cfg(test)]
mod tests {
    #[test]
    fn config_path_is_valid() {
        let path = searchhop_config::AppConfig::config_dir().join("config.toml");
        assert!(path.to_str().unwrap().contains(".searchhop"));
    }
}
