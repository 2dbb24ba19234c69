//! [`Args`] definitions.

use clap::Parser;

/// GraphQL server of the Lidit blog.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    ///
    /// Missing file is not an error: defaults and `CONF.*` environment
    /// variables are used then.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser as _;

    use super::Args;

    #[test]
    fn config_path_defaults() {
        let args = Args::try_parse_from(["lidit"]).unwrap();
        assert_eq!(args.config, "config.toml");

        let args = Args::try_parse_from(["lidit", "-c", "prod.toml"]).unwrap();
        assert_eq!(args.config, "prod.toml");
    }
}
