use clap::Parser;

/// Offline cache worker for the clinic web app
#[derive(Parser, Debug)]
#[command(version = crate::consts::BUILD_VERSION, about, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", default_value = "./config.toml")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config() {
        let cli = Cli::parse_from(["haven"]);
        assert_eq!(cli.config, "./config.toml");

        let cli = Cli::parse_from(["haven", "-c", "/etc/haven.toml"]);
        assert_eq!(cli.config, "/etc/haven.toml");
    }
}
