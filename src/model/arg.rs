use clap::Parser;

/// Xero OAuth2 connect demo server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listen address (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Env file loaded before reading configuration
    #[arg(long, default_value = ".env")]
    pub env_file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["xero-connect"]);
        assert!(args.host.is_none());
        assert!(args.port.is_none());
        assert_eq!(args.env_file, ".env");
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["xero-connect", "--host", "0.0.0.0", "-p", "8080"]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(8080));
    }
}
